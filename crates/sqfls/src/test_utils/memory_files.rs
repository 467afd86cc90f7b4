//! In-memory `FileReader` that counts reads per path.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::index::content::FileReader;

#[derive(Debug, Default)]
pub struct MemoryFiles {
    files: Mutex<HashMap<PathBuf, String>>,
    reads: Mutex<HashMap<PathBuf, usize>>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let memory = Self::new();
        for (path, text) in files {
            memory.insert(path, text);
        }
        memory
    }

    pub fn insert(&self, path: impl AsRef<Path>, text: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), text.to_string());
    }

    /// Reads attempted for `path`, including failed ones
    pub fn read_count(&self, path: &Path) -> usize {
        self.reads.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl FileReader for MemoryFiles {
    async fn read(&self, path: &Path) -> io::Result<String> {
        *self
            .reads
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default() += 1;
        self.files.lock().unwrap().get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not in memory", path.display()),
            )
        })
    }
}
