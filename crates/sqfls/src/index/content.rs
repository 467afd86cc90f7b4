//
// index/content.rs
//
// File content access for include loading and position mapping
//

use std::io;
use std::path::Path;

use async_trait::async_trait;

/// Source of file text. Reads are suspension points; nothing here blocks.
#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads files from disk. Invalid UTF-8 is decoded lossily.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskReader;

#[async_trait]
impl FileReader for DiskReader {
    async fn read(&self, path: &Path) -> io::Result<String> {
        let bytes = tokio::fs::read(path).await?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                log::trace!("{} is not valid UTF-8, decoding lossily", path.display());
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        })
    }
}
