//
// config.rs
//
// Configuration for workspace analysis
//

use std::collections::{HashMap, HashSet};

use serde_json::Value;

/// Analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Glob patterns (relative to the workspace root) skipped during indexing
    pub exclude: Vec<String>,
    /// Lower-cased global names never reported as undefined
    pub ignored_variables: HashSet<String>,
    /// Include path aliases, e.g. `\x\cba` -> `/home/me/cba`
    pub include_prefixes: HashMap<String, String>,
    /// Whether to index the workspace on startup
    pub index_workspace: bool,
    /// Run a second full pass so forward references resolve as defined
    pub index_workspace_twice: bool,
    /// Whether warning-level diagnostics are emitted (errors always are)
    pub warnings: bool,
    /// Quiet period before a live-edit analysis runs, in milliseconds
    pub debounce_ms: u64,
    /// Number of files between two indexing progress reports
    pub progress_interval: usize,
    /// Evict macros no document defines anymore
    pub evict_orphan_macros: bool,
}

impl Default for AnalyzerConfig {
    /// Defaults match an editor that sent no settings: index once, emit
    /// warnings, no excludes and no include aliases.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqfls::config::AnalyzerConfig;
    ///
    /// let cfg = AnalyzerConfig::default();
    /// assert!(cfg.index_workspace);
    /// assert!(!cfg.index_workspace_twice);
    /// assert!(cfg.warnings);
    /// assert_eq!(cfg.debounce_ms, 200);
    /// ```
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            ignored_variables: HashSet::new(),
            include_prefixes: HashMap::new(),
            index_workspace: true,
            index_workspace_twice: false,
            warnings: true,
            debounce_ms: 200,
            progress_interval: 10,
            evict_orphan_macros: false,
        }
    }
}

impl AnalyzerConfig {
    /// Check whether a global is exempt from undefined-variable warnings
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_variables.contains(&name.to_lowercase())
    }
}

/// Parse analyzer configuration from editor settings.
///
/// Reads the top-level `sqflint` section. Only keys present in the JSON are
/// applied; absent keys keep their defaults from `AnalyzerConfig::default()`.
///
/// Supported keys: `exclude`, `ignoredVariables`, `includePrefixes`,
/// `indexWorkspace`, `indexWorkspaceTwice`, `warnings`, `debounceMs`,
/// `progressInterval`, `evictOrphanMacros`.
///
/// # Returns
///
/// `Some(AnalyzerConfig)` when the `sqflint` section is present, `None` otherwise.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use sqfls::config::parse_analyzer_config;
///
/// let settings = json!({
///     "sqflint": {
///         "exclude": ["addons/**"],
///         "ignoredVariables": ["BIS_fnc_MP"],
///         "includePrefixes": { "\\x\\cba": "/opt/cba" },
///         "indexWorkspaceTwice": true
///     }
/// });
///
/// let cfg = parse_analyzer_config(&settings).unwrap();
/// assert!(cfg.index_workspace_twice);
/// assert!(cfg.is_ignored("bis_fnc_mp"));
/// ```
pub fn parse_analyzer_config(settings: &Value) -> Option<AnalyzerConfig> {
    let section = settings.get("sqflint")?;
    let mut config = AnalyzerConfig::default();

    if let Some(v) = section.get("exclude").and_then(|v| v.as_array()) {
        config.exclude = v
            .iter()
            .filter_map(|p| p.as_str())
            .map(|p| p.to_string())
            .collect();
    }
    if let Some(v) = section.get("ignoredVariables").and_then(|v| v.as_array()) {
        config.ignored_variables = v
            .iter()
            .filter_map(|n| n.as_str())
            .map(|n| n.to_lowercase())
            .collect();
    }
    if let Some(v) = section.get("includePrefixes").and_then(|v| v.as_object()) {
        config.include_prefixes = v
            .iter()
            .filter_map(|(alias, target)| Some((alias.clone(), target.as_str()?.to_string())))
            .collect();
    }
    if let Some(v) = section.get("indexWorkspace").and_then(|v| v.as_bool()) {
        config.index_workspace = v;
    }
    if let Some(v) = section.get("indexWorkspaceTwice").and_then(|v| v.as_bool()) {
        config.index_workspace_twice = v;
    }
    if let Some(v) = section.get("warnings").and_then(|v| v.as_bool()) {
        config.warnings = v;
    }
    if let Some(v) = section.get("debounceMs").and_then(|v| v.as_u64()) {
        config.debounce_ms = v;
    }
    if let Some(v) = section.get("progressInterval").and_then(|v| v.as_u64()) {
        // Zero would report on no file at all
        config.progress_interval = (v as usize).max(1);
    }
    if let Some(v) = section.get("evictOrphanMacros").and_then(|v| v.as_bool()) {
        config.evict_orphan_macros = v;
    }

    log::info!("Analyzer configuration:");
    log::info!("  exclude: {:?}", config.exclude);
    log::info!("  ignored_variables: {}", config.ignored_variables.len());
    log::info!("  include_prefixes: {:?}", config.include_prefixes);
    log::info!(
        "  index_workspace: {} (twice: {})",
        config.index_workspace,
        config.index_workspace_twice
    );
    log::info!("  warnings: {}", config.warnings);
    log::info!("  debounce_ms: {}", config.debounce_ms);

    Some(config)
}
