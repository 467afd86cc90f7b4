// lib.rs - Library root for the sqfls analysis core.
//
// The binary in main.rs only hosts the command line; everything it runs
// lives here so integration tests and editor integrations can link it.

pub mod builtins;
pub mod cli;
pub mod config;
pub mod frontend;
pub mod index;
pub mod perf;
pub mod reserved_words;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod utf16;
pub mod workspace;

pub use config::{parse_analyzer_config, AnalyzerConfig};
pub use frontend::{LiteFrontend, ScriptFrontend};
pub use workspace::{DiagnosticsSink, LogProgress, ProgressReporter, Workspace};
