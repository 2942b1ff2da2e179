//! Server-wide counters drained on an interval.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Counter incremented once per spawned transfer worker.
pub const PROCESS_COUNT: &str = "process_count";

/// Named counters shared by every session of the server.
///
/// The transport runtime increments; the stats reporter drains. A drain swaps
/// the whole map out under the lock, so no increment is lost or counted twice.
#[derive(Debug)]
pub struct ServerStats {
    counters: Mutex<HashMap<String, u64>>,
    interval: Duration,
}

impl ServerStats {
    pub fn new(interval: Duration) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            interval,
        }
    }

    /// Reporting interval the counters are drained on.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        let mut counters = self.lock();
        match counters.get_mut(name) {
            Some(counter) => *counter = counter.saturating_add(value),
            None => {
                counters.insert(name.to_string(), value);
            }
        }
    }

    /// Count one transfer worker.
    pub fn record_worker_spawned(&self) {
        self.increment(PROCESS_COUNT);
    }

    /// Current value without resetting.
    pub fn get(&self, name: &str) -> u64 {
        self.lock().get(name).copied().unwrap_or(0)
    }

    /// Return every counter and reset them all in one step.
    pub fn get_and_reset_all_counters(&self) -> HashMap<String, u64> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        // Counters stay usable even if an incrementing thread panicked.
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
