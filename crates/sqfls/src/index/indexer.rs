//
// index/indexer.rs
//
// Whole-workspace indexing: enumerate script files and analyze them one by
// one, in one or two passes
//

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::frontend::ScriptFrontend;
use crate::perf::TimingGuard;
use crate::workspace::Workspace;

/// Extension of indexed script files, matched case-insensitively
pub const SCRIPT_EXTENSION: &str = "sqf";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub files: usize,
    /// Files that could not be read, summed over passes
    pub failed: usize,
    pub passes: usize,
    pub elapsed: Duration,
}

/// Script files under `root` minus those matching an `exclude` glob, sorted
/// by path. Globs match the path relative to `root` with `/` separators.
pub fn enumerate_files(root: &Path, exclude: &[String]) -> Vec<PathBuf> {
    let patterns: Vec<Pattern> = exclude
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                log::warn!("Ignoring invalid exclude pattern '{}': {}", p, e);
                None
            }
        })
        .collect();

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
        })
        .map(|e| e.into_path())
        .filter(|path| !is_excluded(path, root, &patterns))
        .collect();
    files.sort();
    files
}

fn is_excluded(path: &Path, root: &Path, patterns: &[Pattern]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    let relative = relative.to_string_lossy().replace('\\', "/");
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    patterns.iter().any(|p| p.matches_with(&relative, options))
}

/// Percentage shown to the user. A two-pass run maps pass one onto 0-50 and
/// pass two onto 50-100.
fn overall_percent(done: usize, total: usize, second_pass: bool, two_pass: bool) -> u32 {
    let percent = if total == 0 { 0 } else { (100 * done / total) as u32 };
    match (two_pass, second_pass) {
        (false, _) => percent,
        (true, false) => percent / 2,
        (true, true) => 50 + percent / 2,
    }
}

impl<F: ScriptFrontend> Workspace<F> {
    /// Analyze every script file under `root`, sequentially.
    ///
    /// With `indexWorkspaceTwice` a first-pass call follows up with a second
    /// pass so references to globals defined in later files resolve. The
    /// progress indicator is cleared once, after the last pass.
    pub async fn index_workspace(&self, root: &Path, is_second_pass: bool) -> IndexSummary {
        let config = self.config();
        let two_pass = config.index_workspace_twice;
        let files = enumerate_files(root, &config.exclude);
        let started = Instant::now();
        log::info!("Indexing {} script files under {}", files.len(), root.display());

        let mut summary = IndexSummary {
            files: files.len(),
            ..Default::default()
        };
        let mut second_pass = is_second_pass;
        loop {
            summary.failed += self
                .run_pass(&files, second_pass, two_pass, config.progress_interval)
                .await;
            summary.passes += 1;
            if second_pass || !two_pass {
                break;
            }
            second_pass = true;
        }

        self.progress.clear();
        summary.elapsed = started.elapsed();
        log::info!(
            "Indexed {} files in {} pass(es), {} failed, {:?}",
            summary.files,
            summary.passes,
            summary.failed,
            summary.elapsed
        );
        summary
    }

    /// Startup indexing, skipped when `indexWorkspace` is off
    pub async fn initial_index(&self, root: &Path) -> Option<IndexSummary> {
        if !self.config().index_workspace {
            log::info!("Workspace indexing disabled");
            return None;
        }
        Some(self.index_workspace(root, false).await)
    }

    async fn run_pass(&self, files: &[PathBuf], second_pass: bool, two_pass: bool, interval: usize) -> usize {
        let _timing = TimingGuard::new(if second_pass { "index:pass2" } else { "index:pass1" });
        let interval = interval.max(1);
        let mut failed = 0;
        for (i, path) in files.iter().enumerate() {
            if i % interval == 0 {
                self.progress
                    .report(overall_percent(i, files.len(), second_pass, two_pass));
            }
            if let Err(e) = self.analyze_file(path).await {
                log::warn!("Failed to index {}: {:#}", path.display(), e);
                failed += 1;
            }
        }
        failed
    }
}
