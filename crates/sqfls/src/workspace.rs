//
// workspace.rs
//
// Analysis orchestration: runs the per-document pipeline, serializes
// reconciliation into the symbol store and routes diagnostics per file
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tower_lsp::lsp_types::{Diagnostic, Url};

use crate::config::AnalyzerConfig;
use crate::frontend::ScriptFrontend;
use crate::index::content::{DiskReader, FileReader};
use crate::index::debounce::DebounceScheduler;
use crate::index::include_resolve::path_to_uri;
use crate::index::pipeline::{self, IncludeInfo, ParseInfo};
use crate::index::store::{
    DocumentVariable, GlobalMacro, GlobalVariable, NameOwnershipOracle, NoOwners, StoreStats,
    SymbolMatch, SymbolStore,
};

/// Receiver of per-file diagnostics. A publish replaces everything
/// previously published for that URI.
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>);
}

#[async_trait]
impl DiagnosticsSink for tower_lsp::Client {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        self.publish_diagnostics(uri, diagnostics, None).await;
    }
}

/// Coarse indexing progress
pub trait ProgressReporter: Send + Sync {
    fn report(&self, percent: u32);
    fn clear(&self);
}

/// Logs progress at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, percent: u32) {
        log::info!("Indexing workspace: {}%", percent);
    }

    fn clear(&self) {
        log::info!("Indexing workspace: done");
    }
}

pub struct Workspace<F: ScriptFrontend> {
    frontend: F,
    config: RwLock<Arc<AnalyzerConfig>>,
    /// Single writer: reconciliation of one document completes before the
    /// next one starts
    store: Mutex<SymbolStore>,
    includes: RwLock<HashMap<Url, Vec<IncludeInfo>>>,
    debouncer: RwLock<DebounceScheduler>,
    sink: Arc<dyn DiagnosticsSink>,
    oracle: Arc<dyn NameOwnershipOracle>,
    pub(crate) reader: Arc<dyn FileReader>,
    pub(crate) progress: Arc<dyn ProgressReporter>,
}

impl<F: ScriptFrontend> Workspace<F> {
    pub fn new(frontend: F, config: AnalyzerConfig, sink: Arc<dyn DiagnosticsSink>) -> Self {
        let debouncer = DebounceScheduler::new(Duration::from_millis(config.debounce_ms));
        Self {
            frontend,
            config: RwLock::new(Arc::new(config)),
            store: Mutex::new(SymbolStore::new()),
            includes: RwLock::new(HashMap::new()),
            debouncer: RwLock::new(debouncer),
            sink,
            oracle: Arc::new(NoOwners),
            reader: Arc::new(DiskReader),
            progress: Arc::new(LogProgress),
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn FileReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn NameOwnershipOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<AnalyzerConfig> {
        Arc::clone(&self.config.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the configuration. Takes effect for analyses started afterwards.
    pub fn set_config(&self, config: AnalyzerConfig) {
        let delay = Duration::from_millis(config.debounce_ms);
        {
            let mut debouncer = self.debouncer.write().unwrap_or_else(PoisonError::into_inner);
            if debouncer.delay() != delay {
                debouncer.cancel_all();
                *debouncer = DebounceScheduler::new(delay);
            }
        }
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    /// Analyze `text` as the content of `uri`, fold the result into the
    /// store and publish diagnostics for every affected file.
    pub async fn analyze_document(&self, uri: &Url, text: &str) {
        let config = self.config();
        let info = pipeline::analyze_document(
            &self.frontend,
            &config,
            uri,
            text,
            Arc::clone(&self.reader),
        )
        .await;

        let undefined = {
            let mut store = self.store.lock().await;
            store.reconcile(uri, &info, &config, self.oracle.as_ref())
        };

        self.includes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.clone(), info.includes.clone());

        self.publish(uri, &info, undefined, &config).await;
    }

    /// Read `path` through the workspace reader and analyze it
    pub async fn analyze_file(&self, path: &Path) -> anyhow::Result<()> {
        let uri = path_to_uri(path).ok_or_else(|| anyhow!("not an absolute path: {}", path.display()))?;
        let text = self
            .reader
            .read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        self.analyze_document(&uri, &text).await;
        Ok(())
    }

    /// Forget a closed or deleted document and clear its diagnostics
    pub async fn remove_document(&self, uri: &Url) {
        let config = self.config();
        self.store.lock().await.remove_document(uri, &config);
        self.includes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri);
        self.sink.publish(uri.clone(), Vec::new()).await;
    }

    async fn publish(&self, uri: &Url, info: &ParseInfo, undefined: Vec<Diagnostic>, config: &AnalyzerConfig) {
        let mut by_file: HashMap<Url, Vec<Diagnostic>> = HashMap::new();
        by_file.insert(uri.clone(), Vec::new());
        // Included files get a publish even when clean, clearing stale entries
        for include in &info.includes {
            if let Some(target) = path_to_uri(&include.expanded_filename) {
                by_file.entry(target).or_default();
            }
        }

        for error in &info.errors {
            by_file
                .entry(error.uri.clone())
                .or_default()
                .push(error.diagnostic.clone());
        }
        if config.warnings {
            for warning in &info.warnings {
                by_file
                    .entry(warning.uri.clone())
                    .or_default()
                    .push(warning.diagnostic.clone());
            }
            by_file.entry(uri.clone()).or_default().extend(undefined);
        }

        let mut files: Vec<(Url, Vec<Diagnostic>)> = by_file.into_iter().collect();
        files.sort_by(|a, b| (a.0 != *uri).cmp(&(b.0 != *uri)).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        for (target, diagnostics) in files {
            log::trace!("Publishing {} diagnostics for {}", diagnostics.len(), target);
            self.sink.publish(target, diagnostics).await;
        }
    }

    /// Expanded path of the include written as `written` in `uri`, from the
    /// document's last analysis
    pub fn include_target(&self, uri: &Url, written: &str) -> Option<PathBuf> {
        let wanted = normalize_written(written);
        let includes = self.includes.read().unwrap_or_else(PoisonError::into_inner);
        let target = includes
            .get(uri)?
            .iter()
            .find(|include| normalize_written(&include.filename).eq_ignore_ascii_case(&wanted))
            .map(|include| include.expanded_filename.clone());
        target
    }

    /// Includes recorded by the document's last analysis
    pub fn includes_of(&self, uri: &Url) -> Vec<IncludeInfo> {
        self.includes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn find_global(&self, name: &str) -> Option<GlobalVariable> {
        self.store.lock().await.find_global(name).cloned()
    }

    pub async fn find_local(&self, uri: &Url, name: &str) -> Option<DocumentVariable> {
        self.store.lock().await.find_local(uri, name).cloned()
    }

    pub async fn find_macro(&self, name: &str) -> Option<GlobalMacro> {
        self.store.lock().await.find_macro(name).cloned()
    }

    pub async fn find_by_prefix(&self, query: &str) -> Vec<SymbolMatch> {
        self.store.lock().await.find_by_prefix(query)
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.lock().await.stats()
    }

    /// Direct access to the store. Holding the guard blocks reconciliation.
    pub async fn store(&self) -> MutexGuard<'_, SymbolStore> {
        self.store.lock().await
    }
}

impl<F: ScriptFrontend + 'static> Workspace<F> {
    /// Debounced `analyze_document`, keyed by URI. Returns `false` when the
    /// request was dropped because the document is being analyzed.
    pub fn schedule_analysis(self: &Arc<Self>, uri: Url, text: String) -> bool {
        let debouncer = self
            .debouncer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let workspace = Arc::clone(self);
        debouncer.run(uri.to_string(), move || async move {
            workspace.analyze_document(&uri, &text).await;
        })
    }
}

fn normalize_written(path: &str) -> String {
    path.trim().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::LiteFrontend;
    use crate::test_utils::{MemoryFiles, RecordingSink};
    use tower_lsp::lsp_types::{DiagnosticSeverity, Position};

    fn uri(path: &str) -> Url {
        Url::from_file_path(path).unwrap()
    }

    fn workspace(
        files: &Arc<MemoryFiles>,
        config: AnalyzerConfig,
    ) -> (Arc<Workspace<LiteFrontend>>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let ws = Workspace::new(LiteFrontend, config, sink.clone()).with_reader(files.clone());
        (Arc::new(ws), sink)
    }

    #[tokio::test]
    async fn test_undefined_global_published_for_document() {
        let files = Arc::new(MemoryFiles::new());
        let (ws, sink) = workspace(&files, AnalyzerConfig::default());
        let a = uri("/ws/a.sqf");

        ws.analyze_document(&a, "hint str TAG_missing;\n").await;
        let diagnostics = sink.latest_for(&a);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Possibly undefined variable TAG_missing");
        assert_eq!(diagnostics[0].range.start, Position::new(0, 9));
    }

    #[tokio::test]
    async fn test_warnings_gated_errors_kept() {
        let files = Arc::new(MemoryFiles::new());
        let config = AnalyzerConfig {
            warnings: false,
            ..Default::default()
        };
        let (ws, sink) = workspace(&files, config);
        let a = uri("/ws/a.sqf");

        ws.analyze_document(&a, "hint str (TAG_missing + _undefined;\n").await;
        let diagnostics = sink.latest_for(&a);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
    }

    #[tokio::test]
    async fn test_included_files_are_cleared_and_receive_their_errors() {
        let files = Arc::new(MemoryFiles::with_files(&[
            ("/ws/clean.hpp", "#define ONE 1\n"),
            ("/ws/broken.hpp", "#define BAD (ONE +\n"),
        ]));
        let (ws, sink) = workspace(&files, AnalyzerConfig::default());
        let main = uri("/ws/main.sqf");

        ws.analyze_document(&main, "#include \"clean.hpp\"\n#include \"broken.hpp\"\nx = BAD;\n")
            .await;

        let published = sink.published();
        assert_eq!(published[0].0, main);
        assert!(sink.latest_for(&uri("/ws/clean.hpp")).is_empty());
        assert!(sink.latest().contains_key(&uri("/ws/clean.hpp")));
        let broken = sink.latest_for(&uri("/ws/broken.hpp"));
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].range.start, Position::new(0, 12));
    }

    #[tokio::test]
    async fn test_include_target() {
        let files = Arc::new(MemoryFiles::with_files(&[("/ws/common/defs.hpp", "")]));
        let (ws, _) = workspace(&files, AnalyzerConfig::default());
        let a = uri("/ws/a.sqf");
        ws.analyze_document(&a, "#include \"common\\defs.hpp\"\n").await;

        assert_eq!(
            ws.include_target(&a, "common\\defs.hpp"),
            Some(PathBuf::from("/ws/common/defs.hpp"))
        );
        assert_eq!(
            ws.include_target(&a, "common/DEFS.hpp"),
            Some(PathBuf::from("/ws/common/defs.hpp"))
        );
        assert_eq!(ws.include_target(&a, "other.hpp"), None);
        assert_eq!(ws.includes_of(&a).len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_file_reads_through_reader() {
        let files = Arc::new(MemoryFiles::with_files(&[("/ws/a.sqf", "TAG_x = 1;\n")]));
        let (ws, _) = workspace(&files, AnalyzerConfig::default());
        ws.analyze_file(Path::new("/ws/a.sqf")).await.unwrap();
        assert!(ws.find_global("tag_x").await.is_some());

        let err = ws.analyze_file(Path::new("/ws/missing.sqf")).await.unwrap_err();
        assert!(err.to_string().contains("missing.sqf"));
    }

    #[tokio::test]
    async fn test_oracle_suppresses_owned_names() {
        let files = Arc::new(MemoryFiles::new());
        let sink = Arc::new(RecordingSink::new());
        let owned: std::collections::HashSet<String> = ["tag_fnc_init".to_string()].into_iter().collect();
        let ws = Workspace::new(LiteFrontend, AnalyzerConfig::default(), sink.clone())
            .with_reader(files)
            .with_oracle(Arc::new(owned));
        let a = uri("/ws/a.sqf");

        ws.analyze_document(&a, "call TAG_fnc_init;\n").await;
        assert!(sink.latest_for(&a).is_empty());
        assert!(ws.find_global("TAG_fnc_init").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_document_clears_everything() {
        let files = Arc::new(MemoryFiles::new());
        let (ws, sink) = workspace(&files, AnalyzerConfig::default());
        let a = uri("/ws/a.sqf");
        ws.analyze_document(&a, "TAG_x = 1;\n_l = 2;\n").await;
        ws.remove_document(&a).await;

        assert!(ws.find_global("TAG_x").await.is_none());
        assert!(ws.find_local(&a, "_l").await.is_none());
        assert!(sink.latest_for(&a).is_empty());
        assert_eq!(ws.include_target(&a, "x"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_analysis_debounces_edits() {
        let files = Arc::new(MemoryFiles::new());
        let config = AnalyzerConfig {
            debounce_ms: 100,
            ..Default::default()
        };
        let (ws, sink) = workspace(&files, config);
        let a = uri("/ws/a.sqf");

        for i in 0..5 {
            ws.schedule_analysis(a.clone(), format!("TAG_v{} = 1;\n", i));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(sink.published().len(), 1);
        assert!(ws.find_global("TAG_v4").await.is_some());
        assert!(ws.find_global("TAG_v0").await.is_none());
    }

    #[tokio::test]
    async fn test_set_config_applies_to_next_analysis() {
        let files = Arc::new(MemoryFiles::new());
        let (ws, sink) = workspace(&files, AnalyzerConfig::default());
        let a = uri("/ws/a.sqf");

        let mut config = AnalyzerConfig::default();
        config.ignored_variables.insert("tag_missing".to_string());
        ws.set_config(config);
        ws.analyze_document(&a, "hint str TAG_missing;\n").await;
        assert!(sink.latest_for(&a).is_empty());
        assert!(ws.config().is_ignored("TAG_MISSING"));
    }
}
