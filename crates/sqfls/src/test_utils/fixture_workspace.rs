//! Deterministic fixture workspace generator for tests.
//!
//! Generates SQF workspaces with a shared macro header, globals defined per
//! file, locals, and optional forward references from each file to a global
//! defined in the next one. No randomness: the same config always produces
//! byte-identical files.

use std::fmt::Write;
use std::path::Path;
use tempfile::TempDir;

/// Name of the shared header every generated file includes
pub const HEADER_NAME: &str = "script_macros.hpp";

#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub file_count: usize,
    pub globals_per_file: usize,
    pub locals_per_file: usize,
    /// File `i` reads the first global of file `i + 1`
    pub forward_references: bool,
}

impl FixtureConfig {
    /// 10 files, 3 globals and 3 locals each, with forward references
    pub fn small() -> Self {
        Self {
            file_count: 10,
            globals_per_file: 3,
            locals_per_file: 3,
            forward_references: true,
        }
    }
}

/// Name of global `k` defined by file `index`
pub fn global_name(index: usize, k: usize) -> String {
    format!("FIX_g_{}_{}", index, k)
}

/// File name of generated file `index`. Zero padded so path order matches
/// index order.
pub fn file_name(index: usize) -> String {
    format!("fn_{:04}.sqf", index)
}

fn generate_sqf_file_content(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();
    writeln!(content, "#include \"{}\"", HEADER_NAME).unwrap();
    content.push('\n');

    for k in 0..config.globals_per_file {
        writeln!(content, "// Global {} of file {}", k, index).unwrap();
        writeln!(content, "{} = {} * STEP;", global_name(index, k), k).unwrap();
    }
    content.push('\n');

    for k in 0..config.locals_per_file {
        let source = global_name(index, k % config.globals_per_file.max(1));
        if config.globals_per_file == 0 {
            writeln!(content, "private _l_{} = {};", k, k).unwrap();
        } else {
            writeln!(content, "private _l_{} = {} + {};", k, source, k).unwrap();
        }
        writeln!(content, "hint str _l_{};", k).unwrap();
    }

    if config.forward_references && index + 1 < config.file_count && config.globals_per_file > 0 {
        writeln!(content, "hint str {};", global_name(index + 1, 0)).unwrap();
    }

    content
}

/// Create a temporary fixture workspace from the given configuration.
///
/// The directory is cleaned up when the `TempDir` is dropped.
pub fn create_fixture_workspace(config: &FixtureConfig) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    write_fixture_workspace(temp_dir.path(), config);
    temp_dir
}

/// Write fixture files into an existing directory
pub fn write_fixture_workspace(dir: &Path, config: &FixtureConfig) {
    std::fs::write(dir.join(HEADER_NAME), "#define STEP 2\n")
        .unwrap_or_else(|e| panic!("Failed to write fixture header: {}", e));
    for i in 0..config.file_count {
        let filename = file_name(i);
        std::fs::write(dir.join(&filename), generate_sqf_file_content(i, config))
            .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", filename, e));
    }
}
