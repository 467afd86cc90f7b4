//! Sinks that record what the workspace emits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tower_lsp::lsp_types::{Diagnostic, Url};

use crate::workspace::{DiagnosticsSink, ProgressReporter};

/// Keeps every publish in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    published: Mutex<Vec<(Url, Vec<Diagnostic>)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(Url, Vec<Diagnostic>)> {
        self.published.lock().unwrap().clone()
    }

    /// Diagnostics of the most recent publish per URI
    pub fn latest(&self) -> HashMap<Url, Vec<Diagnostic>> {
        self.published.lock().unwrap().iter().cloned().collect()
    }

    pub fn latest_for(&self, uri: &Url) -> Vec<Diagnostic> {
        self.latest().remove(uri).unwrap_or_default()
    }
}

#[async_trait]
impl DiagnosticsSink for RecordingSink {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        self.published.lock().unwrap().push((uri, diagnostics));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Report(u32),
    Clear,
}

#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn percentages(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Report(p) => Some(p),
                ProgressEvent::Clear => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, percent: u32) {
        self.events.lock().unwrap().push(ProgressEvent::Report(percent));
    }

    fn clear(&self) {
        self.events.lock().unwrap().push(ProgressEvent::Clear);
    }
}
