//
// index/include_resolve.rs
//
// Include path resolution for the preprocessor
//

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::content::FileReader;
use crate::frontend::{IncludeError, IncludeResolver};

/// Resolves `#include` paths against registered prefix aliases, falling back
/// to the including file's directory.
pub struct PrefixIncludeResolver {
    /// `(alias, target)` with the alias normalized; longest alias first
    prefixes: Vec<(String, PathBuf)>,
    reader: Arc<dyn FileReader>,
}

impl PrefixIncludeResolver {
    pub fn new(prefixes: &HashMap<String, String>, reader: Arc<dyn FileReader>) -> Self {
        let mut prefixes: Vec<(String, PathBuf)> = prefixes
            .iter()
            .map(|(alias, target)| (normalize_include(alias), PathBuf::from(target)))
            .filter(|(alias, _)| !alias.is_empty())
            .collect();
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { prefixes, reader }
    }

    /// Find the aliased target for an include path, if any alias matches.
    /// Matching ignores ASCII case and only happens on whole path segments.
    fn match_prefix(&self, normalized: &str) -> Option<PathBuf> {
        for (alias, target) in &self.prefixes {
            let Some(head) = normalized.get(..alias.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(alias) {
                continue;
            }
            let rest = &normalized[alias.len()..];
            if rest.is_empty() {
                return Some(target.clone());
            }
            if let Some(rest) = rest.strip_prefix('/') {
                return Some(target.join(rest));
            }
        }
        None
    }
}

#[async_trait]
impl IncludeResolver for PrefixIncludeResolver {
    fn resolve(&self, requested: &str, including_file: &Path) -> Result<PathBuf, IncludeError> {
        let normalized = normalize_include(requested);
        if normalized.is_empty() {
            return Err(IncludeError::Empty);
        }

        let candidate = match self.match_prefix(&normalized) {
            Some(path) => path,
            None => {
                let base = including_file.parent().unwrap_or_else(|| Path::new(""));
                // An absolute include that no alias claims is still relative
                // to the including file's directory
                base.join(normalized.trim_start_matches('/'))
            }
        };

        Ok(normalize_path(&candidate).unwrap_or(candidate))
    }

    async fn load(&self, path: &Path) -> Result<String, IncludeError> {
        self.reader
            .read(path)
            .await
            .map_err(|source| IncludeError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Normalize an include path as written: backslashes become slashes and
/// the leading separator is dropped.
fn normalize_include(path: &str) -> String {
    path.trim()
        .replace('\\', "/")
        .trim_start_matches('/')
        .trim_end_matches('/')
        .to_string()
}

/// Lexically resolve `.` and `..` components.
/// `..` never climbs above the root.
pub fn normalize_path(path: &Path) -> Option<PathBuf> {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }

    if components.is_empty() {
        return None;
    }
    Some(components.iter().collect())
}

/// Convert an absolute path to a `file://` URI
pub fn path_to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

/// Filesystem path of a document URI. Non-file URIs use their path part.
pub fn uri_to_path(uri: &Url) -> PathBuf {
    uri.to_file_path()
        .unwrap_or_else(|_| PathBuf::from(uri.path()))
}
