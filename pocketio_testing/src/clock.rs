//! Hand-driven clock for heartbeat tests.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use pocketio::Clock;

/// [`Clock`] that only moves when told to.
///
/// Clones share the same instant, so a test can advance time while the
/// engine holds its own handle.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self { Self::starting_at(Instant::now()) }

    /// Clock frozen at `start`.
    #[must_use]
    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) { *self.now.lock().expect("clock poisoned") += by; }
}

impl Default for ManualClock {
    fn default() -> Self { Self::new() }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant { *self.now.lock().expect("clock poisoned") }
}
