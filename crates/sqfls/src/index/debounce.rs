//
// index/debounce.rs
//
// Trailing-edge debounce of analysis requests, keyed by string
//

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct DebounceState {
    /// Timers not yet fired, with the generation that armed them
    pending: HashMap<String, (u64, CancellationToken)>,
    /// Keys whose action is currently executing
    running: HashSet<String>,
    next_generation: u64,
}

/// Coalesces bursts of requests into one execution per key.
///
/// A request re-arms the key's timer; the action runs once the key has been
/// quiet for `delay`. Requests arriving while the key's action executes are
/// dropped, not queued.
#[derive(Debug, Clone)]
pub struct DebounceScheduler {
    delay: Duration,
    state: Arc<Mutex<DebounceState>>,
}

impl DebounceScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Request a run of `action` for `key`.
    ///
    /// Returns `false` when the request was dropped because the key is
    /// executing. Must be called from within a tokio runtime.
    pub fn run<F, Fut>(&self, key: impl Into<String>, action: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let (generation, token) = {
            let mut state = lock(&self.state);
            if state.running.contains(&key) {
                log::trace!("Dropping request for {}: already running", key);
                return false;
            }
            if let Some((_, previous)) = state.pending.remove(&key) {
                previous.cancel();
            }
            state.next_generation += 1;
            let generation = state.next_generation;
            let token = CancellationToken::new();
            state.pending.insert(key.clone(), (generation, token.clone()));
            (generation, token)
        };

        let state = Arc::clone(&self.state);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => { return; }
                _ = tokio::time::sleep(delay) => {}
            }

            {
                let mut guard = lock(&state);
                match guard.pending.get(&key) {
                    Some((armed, _)) if *armed == generation => {}
                    _ => return,
                }
                guard.pending.remove(&key);
                guard.running.insert(key.clone());
            }

            let _running = RunningGuard {
                state: Arc::clone(&state),
                key: key.clone(),
            };
            log::trace!("Debounced action for {} starting", key);
            action().await;
        });
        true
    }

    /// Whether the action for `key` is executing right now
    pub fn is_in_flight(&self, key: &str) -> bool {
        lock(&self.state).running.contains(key)
    }

    /// Number of armed timers that have not fired yet
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Cancel every armed timer. Executing actions are left alone.
    pub fn cancel_all(&self) {
        let mut state = lock(&self.state);
        for (_, (_, token)) in state.pending.drain() {
            token.cancel();
        }
    }
}

/// Clears the in-flight flag when the action finishes or panics
struct RunningGuard {
    state: Arc<Mutex<DebounceState>>,
    key: String,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        lock(&self.state).running.remove(&self.key);
    }
}

fn lock(state: &Mutex<DebounceState>) -> MutexGuard<'_, DebounceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
