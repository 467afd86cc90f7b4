//! Test helpers shared by unit tests and integration tests.
//!
//! Compiled for `cfg(test)` and with the `test-support` feature.

pub mod fixture_workspace;
pub mod memory_files;
pub mod recording;

pub use memory_files::MemoryFiles;
pub use recording::{RecordingProgress, RecordingSink};
