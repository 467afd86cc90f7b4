//
// index/pipeline.rs
//
// Per-document analysis: preprocess, tokenize, parse, analyze and lint one
// document, then map every position back to original source coordinates
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, Url};

use super::content::FileReader;
use super::include_resolve::{path_to_uri, uri_to_path, PrefixIncludeResolver};
use super::position_map::PositionMapper;
use crate::config::AnalyzerConfig;
use crate::frontend::{
    FrontendError, RawDiagnostic, RawMacro, RawSeverity, RawVariable, ScriptFrontend, SourceMap,
};
use crate::perf::TimingGuard;

/// `source` attached to every diagnostic this crate emits
pub const DIAGNOSTIC_SOURCE: &str = "sqflint";

/// Prefix marking a variable as private to its document
pub const LOCAL_PREFIX: char = '_';

/// Analyses slower than this are reported with `SQFLS_PERF=verbose`
const SLOW_DOCUMENT: Duration = Duration::from_millis(250);

/// Whether a variable name is document-local. Depends on the name alone.
pub fn is_local_name(name: &str) -> bool {
    name.starts_with(LOCAL_PREFIX)
}

/// A diagnostic and the file it belongs to, which may be an included file
/// rather than the analyzed document
#[derive(Debug, Clone, PartialEq)]
pub struct FileDiagnostic {
    pub uri: Url,
    pub diagnostic: Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableOccurrence {
    pub name: String,
    pub comment: Option<String>,
    pub definitions: Vec<Range>,
    pub usages: Vec<Range>,
}

impl VariableOccurrence {
    pub fn is_local(&self) -> bool {
        is_local_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    /// Range of the macro name in `source_filename`
    pub position: Range,
    pub value: String,
    pub source_filename: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroOccurrence {
    pub name: String,
    pub arguments: Option<String>,
    pub definitions: Vec<MacroDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeInfo {
    /// Document containing the `#include`
    pub document: Url,
    /// Path as written
    pub filename: String,
    pub expanded_filename: PathBuf,
}

/// Mapped result of analyzing one document
#[derive(Debug, Clone, Default)]
pub struct ParseInfo {
    pub errors: Vec<FileDiagnostic>,
    pub warnings: Vec<FileDiagnostic>,
    pub variables: Vec<VariableOccurrence>,
    pub macros: Vec<MacroOccurrence>,
    pub includes: Vec<IncludeInfo>,
}

/// Analyze `text` as the current content of `uri`.
///
/// Never fails: include problems become positioned errors, and a failing
/// tokenize/parse/analyze step collapses into one error for the document with
/// no variables.
pub async fn analyze_document<F>(
    frontend: &F,
    config: &AnalyzerConfig,
    uri: &Url,
    text: &str,
    reader: Arc<dyn FileReader>,
) -> ParseInfo
where
    F: ScriptFrontend + ?Sized,
{
    let _timing = TimingGuard::with_threshold("analyze:document", SLOW_DOCUMENT).detail(|| uri.to_string());
    let path = uri_to_path(uri);
    let resolver = PrefixIncludeResolver::new(&config.include_prefixes, Arc::clone(&reader));
    let mapper = PositionMapper::new(reader);
    mapper.preload(&path, text);
    let mapping = Mapping {
        mapper: &mapper,
        document: uri,
        base: &path,
    };

    let preprocessed = match frontend.preprocess(text, &path, &resolver).await {
        Ok(preprocessed) => preprocessed,
        Err(e) => {
            log::debug!("Preprocessing {} failed: {}", uri, e);
            // Without preprocessed code the offset is in the document's own text
            let error = mapping.failure(&e, &SourceMap::new(), Some(path.as_path())).await;
            return ParseInfo {
                errors: vec![error],
                ..Default::default()
            };
        }
    };
    let source_map = &preprocessed.source_map;

    let includes = preprocessed
        .includes
        .iter()
        .map(|include| IncludeInfo {
            document: uri.clone(),
            filename: include.filename.clone(),
            expanded_filename: include.expanded_filename.clone(),
        })
        .collect();
    let macros = mapping.macros(&preprocessed.macros, source_map).await;

    let (frontend_diagnostics, raw_variables) = match run_frontend(frontend, &preprocessed.code) {
        Ok(result) => result,
        Err(e) => {
            log::debug!("Analysis of {} failed: {}", uri, e);
            let error = mapping.failure(&e, source_map, None).await;
            return ParseInfo {
                errors: vec![error],
                warnings: Vec::new(),
                variables: Vec::new(),
                macros,
                includes,
            };
        }
    };

    let raw_diagnostics: Vec<&RawDiagnostic> = preprocessed
        .errors
        .iter()
        .chain(frontend_diagnostics.iter())
        .collect();
    let (diagnostics, variables) = futures::join!(
        mapping.diagnostics(&raw_diagnostics, source_map),
        mapping.variables(&raw_variables, source_map),
    );

    let (errors, warnings): (Vec<_>, Vec<_>) = diagnostics
        .into_iter()
        .partition(|d| d.diagnostic.severity == Some(DiagnosticSeverity::ERROR));

    ParseInfo {
        errors,
        warnings,
        variables,
        macros,
        includes,
    }
}

/// The synchronous frontend steps over preprocessed code
fn run_frontend<F>(
    frontend: &F,
    code: &str,
) -> Result<(Vec<RawDiagnostic>, Vec<RawVariable>), FrontendError>
where
    F: ScriptFrontend + ?Sized,
{
    let tokens = frontend.tokenize(code)?;
    let parsed = frontend.parse(&tokens)?;
    let variables = frontend.analyze(&parsed.ast, &tokens, code)?;
    let mut diagnostics = parsed.errors;
    diagnostics.extend(frontend.lint(&parsed.ast, code));
    Ok((diagnostics, variables))
}

/// Shared state for mapping one document's raw offsets
struct Mapping<'a> {
    mapper: &'a PositionMapper,
    document: &'a Url,
    base: &'a Path,
}

impl Mapping<'_> {
    fn target_uri(&self, file: &Path) -> Url {
        if file == self.base {
            return self.document.clone();
        }
        path_to_uri(file).unwrap_or_else(|| self.document.clone())
    }

    async fn failure(
        &self,
        error: &FrontendError,
        source_map: &SourceMap,
        map_to_file: Option<&Path>,
    ) -> FileDiagnostic {
        let (uri, position) = match error.offset {
            Some(offset) => {
                let (file, position) = self
                    .mapper
                    .map_offset(offset, source_map, self.base, map_to_file)
                    .await;
                (self.target_uri(&file), position)
            }
            None => (self.document.clone(), Position::new(0, 0)),
        };
        FileDiagnostic {
            uri,
            diagnostic: make_diagnostic(
                Range::new(position, position),
                DiagnosticSeverity::ERROR,
                error.message.clone(),
            ),
        }
    }

    async fn diagnostics(&self, raw: &[&RawDiagnostic], source_map: &SourceMap) -> Vec<FileDiagnostic> {
        let mapped = join_all(raw.iter().map(|d| {
            self.mapper.map_range(&d.span, source_map, self.base, None)
        }))
        .await;

        raw.iter()
            .zip(mapped)
            .map(|(d, (file, range))| {
                let severity = match d.severity {
                    RawSeverity::Error => DiagnosticSeverity::ERROR,
                    RawSeverity::Warning => DiagnosticSeverity::WARNING,
                };
                FileDiagnostic {
                    uri: self.target_uri(&file),
                    diagnostic: make_diagnostic(range, severity, d.message.clone()),
                }
            })
            .collect()
    }

    async fn variables(&self, raw: &[RawVariable], source_map: &SourceMap) -> Vec<VariableOccurrence> {
        join_all(raw.iter().map(|variable| async move {
            let (definitions, usages) = futures::join!(
                join_all(
                    variable
                        .definitions
                        .iter()
                        .map(|span| self.mapper.map_range(span, source_map, self.base, None))
                ),
                join_all(
                    variable
                        .usages
                        .iter()
                        .map(|span| self.mapper.map_range(span, source_map, self.base, None))
                ),
            );
            VariableOccurrence {
                name: variable.name.clone(),
                comment: variable.comment.clone(),
                definitions: definitions.into_iter().map(|(_, range)| range).collect(),
                // Usages are stored and warned under this document, so only
                // those in its own text keep their range
                usages: usages
                    .into_iter()
                    .filter(|(file, _)| file == self.base)
                    .map(|(_, range)| range)
                    .collect(),
            }
        }))
        .await
    }

    /// Macro offsets are already in their defining file's text, so they skip
    /// the source map
    async fn macros(&self, raw: &[RawMacro], source_map: &SourceMap) -> Vec<MacroOccurrence> {
        let positions = join_all(raw.iter().map(|m| {
            let span = m.offset..m.offset + m.name.len();
            async move {
                self.mapper
                    .map_range(&span, source_map, self.base, Some(m.filename.as_path()))
                    .await
            }
        }))
        .await;

        let mut occurrences: Vec<MacroOccurrence> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (m, (_, position)) in raw.iter().zip(positions) {
            let idx = *by_name.entry(m.name.to_lowercase()).or_insert_with(|| {
                occurrences.push(MacroOccurrence {
                    name: m.name.clone(),
                    arguments: m.arguments.clone(),
                    definitions: Vec::new(),
                });
                occurrences.len() - 1
            });
            occurrences[idx].definitions.push(MacroDefinition {
                position,
                value: m.value.clone(),
                source_filename: m.filename.clone(),
            });
        }
        occurrences
    }
}

pub(crate) fn make_diagnostic(range: Range, severity: DiagnosticSeverity, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(severity),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message,
        ..Default::default()
    }
}
