//
// index/store.rs
//
// Workspace symbol store: per-document locals, cross-document globals and
// macros, reconciled on every analysis of a document
//

use std::collections::{HashMap, HashSet};

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range, Url};

use super::pipeline::{make_diagnostic, MacroDefinition, ParseInfo};
use super::prefix::PrefixIndex;
use crate::builtins::is_builtin;
use crate::config::AnalyzerConfig;
use crate::reserved_words::is_reserved_word;

/// Names owned by other collaborators (function libraries, mission
/// variables). Globals with such names are never tracked here.
pub trait NameOwnershipOracle: Send + Sync {
    fn owns(&self, name: &str) -> bool;
}

/// Oracle that owns nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOwners;

impl NameOwnershipOracle for NoOwners {
    fn owns(&self, _name: &str) -> bool {
        false
    }
}

/// Lower-cased owned names
impl NameOwnershipOracle for HashSet<String> {
    fn owns(&self, name: &str) -> bool {
        self.contains(&name.to_lowercase())
    }
}

/// A local variable of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentVariable {
    pub name: String,
    pub comment: Option<String>,
    pub usage_ranges: Vec<Range>,
    pub definition_ranges: Vec<Range>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariable {
    pub name: String,
    /// First non-empty comment seen; never replaced once set
    pub comment: Option<String>,
    pub definitions: HashMap<Url, Vec<Range>>,
    pub usage: HashMap<Url, Vec<Range>>,
}

impl GlobalVariable {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            comment: None,
            definitions: HashMap::new(),
            usage: HashMap::new(),
        }
    }

    /// Whether any document defines this global
    pub fn is_defined(&self) -> bool {
        self.definitions.values().any(|ranges| !ranges.is_empty())
    }

    pub fn is_used(&self) -> bool {
        self.usage.values().any(|ranges| !ranges.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalMacro {
    pub name: String,
    pub arguments: Option<String>,
    pub definitions: HashMap<Url, Vec<MacroDefinition>>,
}

impl GlobalMacro {
    pub fn is_defined(&self) -> bool {
        self.definitions.values().any(|defs| !defs.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Global,
    Macro,
}

/// A prefix lookup hit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolMatch {
    pub name: String,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub documents: usize,
    pub locals: usize,
    pub globals: usize,
    pub macros: usize,
}

/// Local, global and macro tables.
///
/// Not internally synchronized. Owners serialize mutation so that one
/// document's reconciliation completes before the next begins.
#[derive(Debug, Default)]
pub struct SymbolStore {
    locals: HashMap<Url, HashMap<String, DocumentVariable>>,
    globals: HashMap<String, GlobalVariable>,
    macros: HashMap<String, GlobalMacro>,
    prefix: PrefixIndex<SymbolMatch>,
    prefix_dirty: bool,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one analysis of `uri` into the tables and return the
    /// undefined-global warnings for that document.
    pub fn reconcile(
        &mut self,
        uri: &Url,
        info: &ParseInfo,
        config: &AnalyzerConfig,
        oracle: &dyn NameOwnershipOracle,
    ) -> Vec<Diagnostic> {
        // Locals: full replace
        let mut locals: HashMap<String, DocumentVariable> = HashMap::new();
        for variable in info.variables.iter().filter(|v| v.is_local()) {
            let local = locals
                .entry(variable.name.to_lowercase())
                .or_insert_with(|| DocumentVariable {
                    name: variable.name.clone(),
                    comment: None,
                    usage_ranges: Vec::new(),
                    definition_ranges: Vec::new(),
                });
            if local.comment.is_none() {
                local.comment = non_empty(&variable.comment);
            }
            local.definition_ranges.extend(variable.definitions.iter().copied());
            local.usage_ranges.extend(variable.usages.iter().copied());
        }
        self.locals.insert(uri.clone(), locals);

        self.clear_contribution(uri);

        let mut seen_globals: Vec<String> = Vec::new();
        for variable in info.variables.iter().filter(|v| !v.is_local()) {
            if is_reserved_word(&variable.name) || is_builtin(&variable.name) || oracle.owns(&variable.name) {
                continue;
            }
            let key = variable.name.to_lowercase();
            let global = self
                .globals
                .entry(key.clone())
                .or_insert_with(|| GlobalVariable::new(&variable.name));
            if global.comment.is_none() {
                global.comment = non_empty(&variable.comment);
            }
            if !variable.definitions.is_empty() {
                global
                    .definitions
                    .entry(uri.clone())
                    .or_default()
                    .extend(variable.definitions.iter().copied());
            }
            if !variable.usages.is_empty() {
                global
                    .usage
                    .entry(uri.clone())
                    .or_default()
                    .extend(variable.usages.iter().copied());
            }
            if !seen_globals.contains(&key) {
                seen_globals.push(key);
            }
        }

        for occurrence in &info.macros {
            let global = self
                .macros
                .entry(occurrence.name.to_lowercase())
                .or_insert_with(|| GlobalMacro {
                    name: occurrence.name.clone(),
                    arguments: None,
                    definitions: HashMap::new(),
                });
            // Latest reconciled definition decides the signature
            global.arguments = occurrence.arguments.clone();
            global
                .definitions
                .entry(uri.clone())
                .or_default()
                .extend(occurrence.definitions.iter().cloned());
        }

        self.sweep(config);

        let mut warnings = Vec::new();
        for key in &seen_globals {
            let Some(global) = self.globals.get(key) else {
                continue;
            };
            if global.is_defined() || self.macros.contains_key(key) || config.is_ignored(&global.name) {
                continue;
            }
            for range in global.usage.get(uri).into_iter().flatten() {
                warnings.push(make_diagnostic(
                    *range,
                    DiagnosticSeverity::WARNING,
                    format!("Possibly undefined variable {}", global.name),
                ));
            }
        }

        log::trace!(
            "Reconciled {}: {} locals, {} globals, {} macros, {} undefined warnings",
            uri,
            self.locals.get(uri).map_or(0, |l| l.len()),
            seen_globals.len(),
            info.macros.len(),
            warnings.len()
        );
        warnings
    }

    /// Drop everything `uri` contributed, as when the file is deleted
    pub fn remove_document(&mut self, uri: &Url, config: &AnalyzerConfig) {
        self.locals.remove(uri);
        self.clear_contribution(uri);
        self.sweep(config);
    }

    fn clear_contribution(&mut self, uri: &Url) {
        for global in self.globals.values_mut() {
            global.definitions.remove(uri);
            global.usage.remove(uri);
        }
        for global in self.macros.values_mut() {
            global.definitions.remove(uri);
        }
        self.prefix_dirty = true;
    }

    fn sweep(&mut self, config: &AnalyzerConfig) {
        self.globals.retain(|_, g| g.is_defined() || g.is_used());
        // Macros stay even when nothing defines them anymore unless asked
        if config.evict_orphan_macros {
            self.macros.retain(|_, m| m.is_defined());
        }
        self.prefix_dirty = true;
    }

    pub fn find_global(&self, name: &str) -> Option<&GlobalVariable> {
        self.globals.get(&name.to_lowercase())
    }

    pub fn find_local(&self, uri: &Url, name: &str) -> Option<&DocumentVariable> {
        self.locals.get(uri)?.get(&name.to_lowercase())
    }

    pub fn find_macro(&self, name: &str) -> Option<&GlobalMacro> {
        self.macros.get(&name.to_lowercase())
    }

    /// Globals and macros whose name starts with `query`, ignoring case
    pub fn find_by_prefix(&mut self, query: &str) -> Vec<SymbolMatch> {
        if self.prefix_dirty {
            self.rebuild_prefix_index();
        }
        self.prefix.find(query)
    }

    fn rebuild_prefix_index(&mut self) {
        self.prefix.clear();
        for global in self.globals.values() {
            self.prefix.add(
                &global.name,
                SymbolMatch {
                    name: global.name.clone(),
                    kind: SymbolKind::Global,
                },
            );
        }
        for global in self.macros.values() {
            self.prefix.add(
                &global.name,
                SymbolMatch {
                    name: global.name.clone(),
                    kind: SymbolKind::Macro,
                },
            );
        }
        self.prefix_dirty = false;
    }

    pub fn globals(&self) -> impl Iterator<Item = &GlobalVariable> + '_ {
        self.globals.values()
    }

    pub fn macros(&self) -> impl Iterator<Item = &GlobalMacro> + '_ {
        self.macros.values()
    }

    pub fn local_variables(&self, uri: &Url) -> impl Iterator<Item = &DocumentVariable> + '_ {
        self.locals.get(uri).into_iter().flat_map(|locals| locals.values())
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            documents: self.locals.len(),
            locals: self.locals.values().map(|l| l.len()).sum(),
            globals: self.globals.len(),
            macros: self.macros.len(),
        }
    }
}

fn non_empty(comment: &Option<String>) -> Option<String> {
    comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::pipeline::{MacroOccurrence, VariableOccurrence};
    use std::path::PathBuf;
    use tower_lsp::lsp_types::Position;

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///ws/{}", name)).unwrap()
    }

    fn at(line: u32) -> Range {
        Range::new(Position::new(line, 0), Position::new(line, 3))
    }

    fn var(name: &str, definitions: &[u32], usages: &[u32]) -> VariableOccurrence {
        VariableOccurrence {
            name: name.to_string(),
            comment: None,
            definitions: definitions.iter().map(|&l| at(l)).collect(),
            usages: usages.iter().map(|&l| at(l)).collect(),
        }
    }

    fn info(variables: Vec<VariableOccurrence>) -> ParseInfo {
        ParseInfo {
            variables,
            ..Default::default()
        }
    }

    fn macro_info(name: &str) -> MacroOccurrence {
        MacroOccurrence {
            name: name.to_string(),
            arguments: None,
            definitions: vec![MacroDefinition {
                position: at(0),
                value: "1".to_string(),
                source_filename: PathBuf::from("/ws/macros.hpp"),
            }],
        }
    }

    fn reconcile(store: &mut SymbolStore, doc: &Url, parse: &ParseInfo) -> Vec<Diagnostic> {
        store.reconcile(doc, parse, &AnalyzerConfig::default(), &NoOwners)
    }

    #[test]
    fn test_reanalysis_is_idempotent() {
        let mut store = SymbolStore::new();
        let a = uri("a.sqf");
        let parse = info(vec![var("G", &[0], &[1, 2]), var("_l", &[3], &[4])]);

        reconcile(&mut store, &a, &parse);
        let globals_once = store.globals.clone();
        let locals_once = store.locals.clone();
        reconcile(&mut store, &a, &parse);

        assert_eq!(store.globals, globals_once);
        assert_eq!(store.locals, locals_once);
        assert_eq!(store.find_global("g").unwrap().usage[&a].len(), 2);
    }

    #[test]
    fn test_stale_definition_removed_and_reported() {
        let mut store = SymbolStore::new();
        let a = uri("a.sqf");
        let b = uri("b.sqf");

        reconcile(&mut store, &a, &info(vec![var("G", &[0], &[])]));
        let warnings = reconcile(&mut store, &b, &info(vec![var("G", &[], &[5])]));
        assert!(warnings.is_empty());

        // A no longer defines G
        reconcile(&mut store, &a, &info(vec![]));
        let global = store.find_global("G").unwrap();
        assert!(!global.definitions.contains_key(&a));

        let warnings = reconcile(&mut store, &b, &info(vec![var("G", &[], &[5])]));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].range, at(5));
        assert_eq!(warnings[0].message, "Possibly undefined variable G");
        assert_eq!(warnings[0].severity, Some(DiagnosticSeverity::WARNING));
    }

    #[test]
    fn test_warning_at_every_usage_in_document() {
        let mut store = SymbolStore::new();
        let warnings = reconcile(&mut store, &uri("a.sqf"), &info(vec![var("G", &[], &[1, 4, 4])]));
        let ranges: Vec<Range> = warnings.iter().map(|w| w.range).collect();
        assert_eq!(ranges, vec![at(1), at(4), at(4)]);
    }

    #[test]
    fn test_usage_only_global_is_evicted() {
        let mut store = SymbolStore::new();
        let a = uri("a.sqf");
        reconcile(&mut store, &a, &info(vec![var("typoVar", &[], &[0])]));
        assert!(store.find_global("typoVar").is_some());
        assert_eq!(store.find_by_prefix("typo").len(), 1);

        reconcile(&mut store, &a, &info(vec![]));
        assert!(store.find_global("typoVar").is_none());
        assert!(store.find_by_prefix("typo").is_empty());
        assert!(store.find_by_prefix("ty").is_empty());
    }

    #[test]
    fn test_reserved_and_owned_names_are_skipped() {
        let mut store = SymbolStore::new();
        let owners: HashSet<String> = ["tag_fnc_spawn".to_string()].into_iter().collect();
        let parse = info(vec![var("hint", &[], &[0]), var("TAG_fnc_spawn", &[], &[1]), var("mine", &[], &[2])]);

        let warnings = store.reconcile(&uri("a.sqf"), &parse, &AnalyzerConfig::default(), &owners);
        assert!(store.find_global("hint").is_none());
        assert!(store.find_global("TAG_fnc_spawn").is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.ends_with("mine"));
    }

    #[test]
    fn test_ignored_variables_suppress_warnings() {
        let mut store = SymbolStore::new();
        let mut config = AnalyzerConfig::default();
        config.ignored_variables.insert("cba_missiontime".to_string());
        let warnings = store.reconcile(
            &uri("a.sqf"),
            &info(vec![var("CBA_missionTime", &[], &[0])]),
            &config,
            &NoOwners,
        );
        assert!(warnings.is_empty());
        // Still tracked
        assert!(store.find_global("cba_missiontime").is_some());
    }

    #[test]
    fn test_macro_counts_as_definition() {
        let mut store = SymbolStore::new();
        let mut parse = info(vec![var("WAVE_SIZE", &[], &[2])]);
        parse.macros.push(macro_info("WAVE_SIZE"));
        let warnings = reconcile(&mut store, &uri("a.sqf"), &parse);
        assert!(warnings.is_empty());
        assert!(store.find_macro("wave_size").is_some());
    }

    #[test]
    fn test_engine_commands_are_not_globals() {
        let mut store = SymbolStore::new();
        let parse = info(vec![
            var("sleep", &[], &[0]),
            var("setDamage", &[], &[1]),
            var("getPos", &[], &[2]),
            var("createVehicle", &[], &[3]),
            var("TAG_spawned", &[], &[3]),
        ]);
        let warnings = reconcile(&mut store, &uri("a.sqf"), &parse);

        let names: Vec<&str> = store.globals().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["TAG_spawned"]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "Possibly undefined variable TAG_spawned");
    }

    #[test]
    fn test_macro_signature_follows_latest_definition() {
        let mut store = SymbolStore::new();
        let a = uri("a.sqf");
        let mut parse = info(vec![]);
        let mut add = macro_info("ADD");
        add.arguments = Some("(a, b)".to_string());
        parse.macros.push(add.clone());
        reconcile(&mut store, &a, &parse);

        add.arguments = Some("(a, b, c)".to_string());
        parse.macros = vec![add];
        reconcile(&mut store, &a, &parse);
        assert_eq!(store.find_macro("ADD").unwrap().arguments.as_deref(), Some("(a, b, c)"));

        let mut plain = macro_info("ADD");
        plain.arguments = None;
        reconcile(&mut store, &a, &ParseInfo { macros: vec![plain], ..Default::default() });
        assert_eq!(store.find_macro("ADD").unwrap().arguments, None);
    }

    #[test]
    fn test_macros_survive_sweep_by_default() {
        let mut store = SymbolStore::new();
        let a = uri("a.sqf");
        let mut parse = info(vec![]);
        parse.macros.push(macro_info("SPEED"));
        reconcile(&mut store, &a, &parse);

        reconcile(&mut store, &a, &info(vec![]));
        let speed = store.find_macro("SPEED").unwrap();
        assert!(!speed.is_defined());
        assert!(speed.definitions.is_empty());
    }

    #[test]
    fn test_orphan_macro_eviction_when_enabled() {
        let mut store = SymbolStore::new();
        let a = uri("a.sqf");
        let config = AnalyzerConfig {
            evict_orphan_macros: true,
            ..Default::default()
        };
        let mut parse = info(vec![]);
        parse.macros.push(macro_info("SPEED"));
        store.reconcile(&a, &parse, &config, &NoOwners);
        store.reconcile(&a, &info(vec![]), &config, &NoOwners);
        assert!(store.find_macro("SPEED").is_none());
    }

    #[test]
    fn test_macro_redefinition_per_document_replaces() {
        let mut store = SymbolStore::new();
        let a = uri("a.sqf");
        let b = uri("b.sqf");
        let mut parse = info(vec![]);
        parse.macros.push(macro_info("SPEED"));
        reconcile(&mut store, &a, &parse);
        reconcile(&mut store, &b, &parse);
        reconcile(&mut store, &a, &parse);

        let speed = store.find_macro("SPEED").unwrap();
        assert_eq!(speed.definitions.len(), 2);
        assert_eq!(speed.definitions[&a].len(), 1);
    }

    #[test]
    fn test_comment_is_sticky() {
        let mut store = SymbolStore::new();
        let mut first = var("G", &[0], &[]);
        first.comment = Some("  ".to_string());
        reconcile(&mut store, &uri("a.sqf"), &info(vec![first]));
        assert_eq!(store.find_global("G").unwrap().comment, None);

        let mut second = var("G", &[0], &[]);
        second.comment = Some("Wave counter".to_string());
        reconcile(&mut store, &uri("b.sqf"), &info(vec![second]));

        let mut third = var("G", &[0], &[]);
        third.comment = Some("Something else".to_string());
        reconcile(&mut store, &uri("c.sqf"), &info(vec![third]));

        assert_eq!(store.find_global("G").unwrap().comment.as_deref(), Some("Wave counter"));
    }

    #[test]
    fn test_locals_are_replaced_and_scoped() {
        let mut store = SymbolStore::new();
        let a = uri("a.sqf");
        let b = uri("b.sqf");
        reconcile(&mut store, &a, &info(vec![var("_old", &[0], &[1])]));
        reconcile(&mut store, &a, &info(vec![var("_new", &[0], &[])]));

        assert!(store.find_local(&a, "_old").is_none());
        assert!(store.find_local(&a, "_NEW").is_some());
        assert!(store.find_local(&b, "_new").is_none());
        assert!(store.find_global("_new").is_none());
        assert_eq!(store.local_variables(&a).count(), 1);
    }

    #[test]
    fn test_remove_document() {
        let mut store = SymbolStore::new();
        let a = uri("a.sqf");
        reconcile(&mut store, &a, &info(vec![var("G", &[0], &[]), var("_l", &[1], &[])]));
        store.remove_document(&a, &AnalyzerConfig::default());

        assert!(store.find_global("G").is_none());
        assert_eq!(store.local_variables(&a).count(), 0);
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn test_find_by_prefix_covers_globals_and_macros() {
        let mut store = SymbolStore::new();
        let mut parse = info(vec![var("TAG_count", &[0], &[])]);
        parse.macros.push(macro_info("TAG_MAX"));
        reconcile(&mut store, &uri("a.sqf"), &parse);

        let mut hits = store.find_by_prefix("tag");
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            hits,
            vec![
                SymbolMatch { name: "TAG_MAX".to_string(), kind: SymbolKind::Macro },
                SymbolMatch { name: "TAG_count".to_string(), kind: SymbolKind::Global },
            ]
        );
        assert_eq!(store.find_by_prefix("tag_c").len(), 1);
        assert_eq!(store.macros().count(), 1);
        assert_eq!(store.globals().count(), 1);
    }
}
