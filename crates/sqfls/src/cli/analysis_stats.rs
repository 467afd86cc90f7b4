// cli/analysis_stats.rs - `sqfls analysis-stats` subcommand
//
// Indexes a workspace with the lite frontend and reports timings and
// symbol/diagnostic counts per phase:
//   1. scan    - discovering script files
//   2. index   - analyzing every file (one or two passes)
//   3. symbols - symbol table sizes after indexing
//   4. lookup  - prefix lookups over every global name

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity};
use url::Url;

use crate::config::{parse_analyzer_config, AnalyzerConfig};
use crate::frontend::LiteFrontend;
use crate::index::enumerate_files;
use crate::perf::TimingGuard;
use crate::workspace::{DiagnosticsSink, Workspace};

/// Parsed arguments for the `analysis-stats` subcommand.
#[derive(Debug)]
pub struct AnalysisStatsArgs {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub twice: bool,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

/// Result of running a single phase.
pub struct PhaseResult {
    pub name: String,
    pub duration: Duration,
    pub detail: String,
}

/// Parse `analysis-stats` arguments from the remaining CLI args.
///
/// Expected usage: `sqfls analysis-stats <path> [--twice] [--config <file>] [--csv | --json]`
pub fn parse_args(args: &mut impl Iterator<Item = String>) -> Result<AnalysisStatsArgs, String> {
    let mut path: Option<PathBuf> = None;
    let mut format = OutputFormat::Table;
    let mut twice = false;
    let mut config: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--csv" | "--json" => {
                if format != OutputFormat::Table {
                    return Err("--csv and --json are mutually exclusive".to_string());
                }
                format = if arg == "--csv" {
                    OutputFormat::Csv
                } else {
                    OutputFormat::Json
                };
            }
            "--twice" => twice = true,
            "--config" => {
                let file = args
                    .next()
                    .ok_or_else(|| "--config requires a file path".to_string())?;
                config = Some(PathBuf::from(file));
            }
            other if other.starts_with('-') => {
                return Err(format!("Unknown flag: '{}'", other));
            }
            _ => {
                if path.is_some() {
                    return Err("Multiple paths provided; expected exactly one".to_string());
                }
                path = Some(PathBuf::from(arg));
            }
        }
    }

    let path = path.ok_or_else(|| "Missing required <path> argument".to_string())?;
    if !path.is_dir() {
        return Err(format!("Not a directory: {}", path.display()));
    }

    Ok(AnalysisStatsArgs {
        path,
        format,
        twice,
        config,
    })
}

/// Load analyzer settings from a JSON file. Accepts either the editor
/// settings shape (`{"sqflint": {...}}`) or the bare section.
pub fn load_config(path: &Path) -> anyhow::Result<AnalyzerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    let settings = if value.get("sqflint").is_some() {
        value
    } else {
        json!({ "sqflint": value })
    };
    Ok(parse_analyzer_config(&settings).unwrap_or_default())
}

/// Latest diagnostics per file, as an editor would display them
#[derive(Debug, Default)]
struct DiagnosticTally {
    latest: Mutex<HashMap<Url, Vec<Diagnostic>>>,
}

impl DiagnosticTally {
    /// `(errors, warnings)` across all files
    fn counts(&self) -> (usize, usize) {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        let all = latest.values().flatten();
        all.fold((0, 0), |(errors, warnings), d| match d.severity {
            Some(DiagnosticSeverity::ERROR) => (errors + 1, warnings),
            _ => (errors, warnings + 1),
        })
    }
}

#[async_trait]
impl DiagnosticsSink for DiagnosticTally {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri, diagnostics);
    }
}

/// Run the analysis-stats command and return phase results.
pub async fn run_analysis_stats(args: &AnalysisStatsArgs) -> anyhow::Result<Vec<PhaseResult>> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AnalyzerConfig::default(),
    };
    config.index_workspace_twice |= args.twice;
    let root = std::fs::canonicalize(&args.path)
        .with_context(|| format!("Failed to resolve {}", args.path.display()))?;

    let mut results = Vec::new();

    // Phase 1: scan
    let files = {
        let guard = TimingGuard::new("analysis-stats:scan");
        let files = enumerate_files(&root, &config.exclude);
        results.push(PhaseResult {
            name: "scan".to_string(),
            duration: guard.finish(),
            detail: format!("{} files", files.len()),
        });
        files
    };

    // Phase 2: index
    let tally = Arc::new(DiagnosticTally::default());
    let workspace = Workspace::new(LiteFrontend, config, tally.clone());
    let summary = workspace.index_workspace(&root, false).await;
    let (errors, warnings) = tally.counts();
    results.push(PhaseResult {
        name: "index".to_string(),
        duration: summary.elapsed,
        detail: format!(
            "{} files, {} pass(es), {} unreadable, {} errors, {} warnings",
            files.len(),
            summary.passes,
            summary.failed,
            errors,
            warnings
        ),
    });

    // Phase 3: symbols
    let guard = TimingGuard::new("analysis-stats:symbols");
    let (stats, names) = {
        let store = workspace.store().await;
        let names: Vec<String> = store.globals().map(|g| g.name.clone()).collect();
        (store.stats(), names)
    };
    results.push(PhaseResult {
        name: "symbols".to_string(),
        duration: guard.finish(),
        detail: format!(
            "{} documents, {} locals, {} globals, {} macros",
            stats.documents, stats.locals, stats.globals, stats.macros
        ),
    });

    // Phase 4: lookup
    {
        let guard = TimingGuard::new("analysis-stats:lookup");
        let mut hits = 0;
        for name in &names {
            hits += workspace.find_by_prefix(name).await.len();
        }
        results.push(PhaseResult {
            name: "lookup".to_string(),
            duration: guard.finish(),
            detail: format!("{} queries, {} hits", names.len(), hits),
        });
    }

    Ok(results)
}

/// Print phase results as a human-readable table.
pub fn print_results(results: &[PhaseResult]) {
    println!("=== sqfls Analysis Stats ===\n");
    for result in results {
        println!(
            "  {:<10} {:>10.2?}   ({})",
            result.name, result.duration, result.detail
        );
    }

    if results.len() > 1 {
        let total: Duration = results.iter().map(|r| r.duration).sum();
        println!("\n  {:<10} {:>10.2?}", "TOTAL", total);
    }
    println!();
}

/// Print phase results in CSV format.
pub fn print_results_csv(results: &[PhaseResult]) {
    println!("phase,duration_ms,detail");
    for result in results {
        println!(
            "{},{:.3},\"{}\"",
            result.name,
            result.duration.as_secs_f64() * 1000.0,
            result.detail.replace('"', "\"\"")
        );
    }
}

#[derive(Serialize)]
struct PhaseRecord<'a> {
    phase: &'a str,
    duration_ms: f64,
    detail: &'a str,
}

/// Print phase results as a JSON array.
pub fn print_results_json(results: &[PhaseResult]) -> anyhow::Result<()> {
    let records: Vec<PhaseRecord<'_>> = results
        .iter()
        .map(|result| PhaseRecord {
            phase: &result.name,
            duration_ms: result.duration.as_secs_f64() * 1000.0,
            detail: &result.detail,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
