//
// index/position_map.rs
//
// Mapping preprocessed offsets back to original file positions
//

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tower_lsp::lsp_types::{Position, Range};

use super::content::FileReader;
use crate::frontend::{SourceMap, Span};
use crate::utf16::byte_offset_to_utf16_column;

/// 1-based line/column location, column counted in UTF-16 code units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn to_position(self) -> Position {
        Position::new(self.line.saturating_sub(1), self.column.saturating_sub(1))
    }
}

/// Line start table over one file's text
#[derive(Debug)]
pub struct LineIndex {
    text: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    /// Location of a byte offset. Offsets past the end clamp to the end.
    pub fn location(&self, offset: usize) -> SourceLocation {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let start = self.line_starts[line];
        let line_end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |&next| next);
        let column = byte_offset_to_utf16_column(&self.text[start..line_end], offset - start);
        SourceLocation {
            line: line as u32 + 1,
            column: column + 1,
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        self.location(offset).to_position()
    }
}

/// Converts preprocessed offsets to positions in the files they came from.
///
/// File text is loaded on first use and cached for the mapper's lifetime;
/// concurrent lookups of the same file share one read. A mapper is meant to
/// live for a single document analysis.
pub struct PositionMapper {
    reader: Arc<dyn FileReader>,
    files: DashMap<PathBuf, Arc<OnceCell<Arc<LineIndex>>>>,
}

impl PositionMapper {
    pub fn new(reader: Arc<dyn FileReader>) -> Self {
        Self {
            reader,
            files: DashMap::new(),
        }
    }

    /// Seed the cache with text already in memory, e.g. an unsaved document
    pub fn preload(&self, path: &Path, text: &str) {
        let index = Arc::new(LineIndex::new(text.to_string()));
        self.files
            .insert(path.to_path_buf(), Arc::new(OnceCell::new_with(Some(index))));
    }

    async fn line_index(&self, path: &Path) -> Arc<LineIndex> {
        // Clone the cell out so no map shard stays locked across the read
        let cell = self.files.entry(path.to_path_buf()).or_default().clone();
        let index = cell
            .get_or_init(|| async {
                let text = match self.reader.read(path).await {
                    Ok(text) => text,
                    Err(e) => {
                        log_read_failure(path, &e);
                        String::new()
                    }
                };
                Arc::new(LineIndex::new(text))
            })
            .await;
        Arc::clone(index)
    }

    /// Map an offset in `base`'s preprocessed code to a file and position.
    ///
    /// `map_to_file` skips the source map: the offset is already in that
    /// file's own text.
    pub async fn map_offset(
        &self,
        offset: usize,
        source_map: &SourceMap,
        base: &Path,
        map_to_file: Option<&Path>,
    ) -> (PathBuf, Position) {
        let (file, target) = match map_to_file {
            Some(file) => (file.to_path_buf(), offset),
            None => match source_map.resolve(offset) {
                Some((file, target)) => (file.to_path_buf(), target),
                None => (base.to_path_buf(), offset),
            },
        };
        let index = self.line_index(&file).await;
        let position = index.position(target);
        (file, position)
    }

    /// Map both ends of a span independently. The range belongs to the file
    /// the start maps to; the end may have landed in another file.
    pub async fn map_range(
        &self,
        span: &Span,
        source_map: &SourceMap,
        base: &Path,
        map_to_file: Option<&Path>,
    ) -> (PathBuf, Range) {
        let ((file, start), (_, end)) = futures::join!(
            self.map_offset(span.start, source_map, base, map_to_file),
            self.map_offset(span.end, source_map, base, map_to_file),
        );
        (file, Range::new(start, end))
    }

    /// Number of files loaded or preloaded so far
    pub fn cached_files(&self) -> usize {
        self.files.len()
    }
}

fn log_read_failure(path: &Path, e: &io::Error) {
    log::debug!(
        "Cannot read {} for position mapping, using empty content: {}",
        path.display(),
        e
    );
}
