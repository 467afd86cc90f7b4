// perf.rs - Timing instrumentation for indexing and analysis
//
// Controlled via the SQFLS_PERF environment variable:
//   SQFLS_PERF=1 sqfls analysis-stats .        # Log phase durations
//   SQFLS_PERF=verbose sqfls analysis-stats .  # Also log slow documents

use std::sync::OnceLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfMode {
    Off,
    On,
    Verbose,
}

impl PerfMode {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            None => PerfMode::Off,
            Some(v) if v.is_empty() || v == "0" || v == "false" => PerfMode::Off,
            Some(v) if v == "verbose" => PerfMode::Verbose,
            Some(_) => PerfMode::On,
        }
    }
}

static PERF_MODE: OnceLock<PerfMode> = OnceLock::new();

/// Mode read once from `SQFLS_PERF`
pub fn mode() -> PerfMode {
    *PERF_MODE.get_or_init(|| PerfMode::from_env_value(std::env::var("SQFLS_PERF").ok().as_deref()))
}

/// RAII timer logging `[PERF] <name> completed in <duration>` on drop when
/// timing is enabled.
///
/// ```
/// use sqfls::perf::TimingGuard;
///
/// let _guard = TimingGuard::new("index:pass1");
/// // ... index ...
/// ```
pub struct TimingGuard {
    start: Instant,
    name: &'static str,
    detail: Option<String>,
    /// Verbose mode warns past this
    threshold: Option<Duration>,
    mode: PerfMode,
}

impl TimingGuard {
    pub fn new(name: &'static str) -> Self {
        Self::begin(name, None, mode())
    }

    /// Timer for work that should finish within `threshold`
    pub fn with_threshold(name: &'static str, threshold: Duration) -> Self {
        Self::begin(name, Some(threshold), mode())
    }

    fn begin(name: &'static str, threshold: Option<Duration>, mode: PerfMode) -> Self {
        Self {
            start: Instant::now(),
            name,
            detail: None,
            threshold,
            mode,
        }
    }

    /// Attach what is being timed, e.g. a document URI. Only formatted when
    /// timing is enabled.
    pub fn detail(mut self, detail: impl FnOnce() -> String) -> Self {
        if self.mode != PerfMode::Off {
            self.detail = Some(detail());
        }
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log now and return the measured duration
    pub fn finish(self) -> Duration {
        self.start.elapsed()
    }

    fn label(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{} ({})", self.name, detail),
            None => self.name.to_string(),
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.mode == PerfMode::Off {
            return;
        }

        let elapsed = self.start.elapsed();
        log::info!("[PERF] {} completed in {:?}", self.label(), elapsed);

        if self.mode == PerfMode::Verbose {
            if let Some(threshold) = self.threshold.filter(|t| elapsed > *t) {
                log::warn!(
                    "[PERF] {} exceeded threshold ({:?} > {:?})",
                    self.label(),
                    elapsed,
                    threshold
                );
            }
        }
    }
}
