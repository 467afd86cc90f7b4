//
// frontend/mod.rs
//
// Boundary to the preprocessor/tokenizer/parser/linter chain
//
// Everything a frontend returns is expressed in byte offsets into the
// preprocessed `code`. The analysis pipeline maps those offsets back to
// original files through the `SourceMap` before anything leaves it.
//

pub mod lite;

use std::ops::Range;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use lite::LiteFrontend;

/// Half-open byte span into preprocessed code
pub type Span = Range<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSeverity {
    Error,
    Warning,
}

/// Diagnostic in preprocessed-code coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDiagnostic {
    pub message: String,
    pub span: Span,
    pub severity: RawSeverity,
}

impl RawDiagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            severity: RawSeverity::Error,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            severity: RawSeverity::Warning,
        }
    }
}

/// All occurrences of one variable name found by the analyzer.
///
/// Duplicate occurrences stay separate entries; nothing is deduplicated here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawVariable {
    pub name: String,
    pub comment: Option<String>,
    pub definitions: Vec<Span>,
    pub usages: Vec<Span>,
}

/// A `#define` seen while preprocessing.
///
/// `offset` is a byte offset into `filename`'s own text, not into the
/// preprocessed code, so it never goes through the source map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMacro {
    pub name: String,
    /// Parameter signature as written, e.g. `(a, b)`
    pub arguments: Option<String>,
    pub value: String,
    pub filename: PathBuf,
    pub offset: usize,
}

/// An `#include` seen while preprocessing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInclude {
    /// Path as written in the directive
    pub filename: String,
    pub expanded_filename: PathBuf,
    pub span: Span,
}

/// Output of the preprocessing step
#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    pub code: String,
    pub source_map: SourceMap,
    pub includes: Vec<RawInclude>,
    pub macros: Vec<RawMacro>,
    /// Recoverable errors such as unresolvable includes
    pub errors: Vec<RawDiagnostic>,
}

/// Output of the parsing step
#[derive(Debug, Clone)]
pub struct ParseOutput<A> {
    /// Recoverable syntax errors
    pub errors: Vec<RawDiagnostic>,
    pub ast: A,
}

/// Unrecoverable failure of a frontend step for one document
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FrontendError {
    pub message: String,
    /// Offset into preprocessed code, when the failure has a position
    pub offset: Option<usize>,
}

impl FrontendError {
    pub fn new(message: impl Into<String>, offset: Option<usize>) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

#[derive(Debug, Error)]
pub enum IncludeError {
    #[error("empty include path")]
    Empty,
    #[error("cannot read include file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("includes nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Callback the preprocessor uses to locate and read included files
#[async_trait]
pub trait IncludeResolver: Send + Sync {
    /// Map a path as written in `#include` to a file path
    fn resolve(&self, requested: &str, including_file: &Path) -> Result<PathBuf, IncludeError>;

    /// Read the text of a resolved include
    async fn load(&self, path: &Path) -> Result<String, IncludeError>;
}

/// The external preprocessor/tokenizer/parser/analyzer/linter chain
#[async_trait]
pub trait ScriptFrontend: Send + Sync {
    type Token: Send + Sync;
    type Ast: Send + Sync;

    async fn preprocess(
        &self,
        text: &str,
        filename: &Path,
        resolver: &dyn IncludeResolver,
    ) -> Result<Preprocessed, FrontendError>;

    fn tokenize(&self, code: &str) -> Result<Vec<Self::Token>, FrontendError>;

    fn parse(&self, tokens: &[Self::Token]) -> Result<ParseOutput<Self::Ast>, FrontendError>;

    fn analyze(
        &self,
        ast: &Self::Ast,
        tokens: &[Self::Token],
        code: &str,
    ) -> Result<Vec<RawVariable>, FrontendError>;

    fn lint(&self, ast: &Self::Ast, code: &str) -> Vec<RawDiagnostic>;
}

// ============================================================================
// Source map
// ============================================================================

/// One run of preprocessed code and the original text it came from.
///
/// A verbatim copy has `original_len == generated.len()`. A macro expansion
/// points at the macro body in its defining file; offsets past the body's
/// length clamp to its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSegment {
    pub generated: Span,
    pub file: PathBuf,
    pub original_offset: usize,
    pub original_len: usize,
}

/// Provenance of preprocessed code, ordered by generated offset
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    segments: Vec<SourceSegment>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `len` bytes copied verbatim from `file` at `original_offset`.
    /// Adjacent copies from the same file merge into one segment.
    pub fn push_copy(&mut self, generated_start: usize, len: usize, file: &Path, original_offset: usize) {
        if len == 0 {
            return;
        }
        if let Some(last) = self.segments.last_mut() {
            let last_is_copy = last.generated.len() == last.original_len;
            if last_is_copy
                && last.generated.end == generated_start
                && last.original_offset + last.original_len == original_offset
                && last.file == file
            {
                last.generated.end += len;
                last.original_len += len;
                return;
            }
        }
        self.push_segment(SourceSegment {
            generated: generated_start..generated_start + len,
            file: file.to_path_buf(),
            original_offset,
            original_len: len,
        });
    }

    /// Record generated text that stands for `original_len` bytes of `file`
    pub fn push_expansion(&mut self, generated: Span, file: &Path, original_offset: usize, original_len: usize) {
        self.push_segment(SourceSegment {
            generated,
            file: file.to_path_buf(),
            original_offset,
            original_len,
        });
    }

    fn push_segment(&mut self, segment: SourceSegment) {
        debug_assert!(
            self.segments
                .last()
                .map_or(true, |last| last.generated.start <= segment.generated.start),
            "source map segments must be pushed in generated order"
        );
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[SourceSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve an offset in preprocessed code to `(file, offset)` in original
    /// text. Returns `None` when the offset precedes every segment.
    pub fn resolve(&self, offset: usize) -> Option<(&Path, usize)> {
        let idx = self
            .segments
            .partition_point(|s| s.generated.start <= offset);
        let segment = self.segments.get(idx.checked_sub(1)?)?;
        let delta = (offset - segment.generated.start).min(segment.original_len);
        Some((segment.file.as_path(), segment.original_offset + delta))
    }
}
