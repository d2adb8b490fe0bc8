//! Time sources for the ledger.
//!
//! Wall-clock milliseconds stamp catalog items and log entries; the monotonic
//! instant drives the undo window so that wall-clock adjustments cannot
//! extend or shorten it.

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Abstraction over time sources.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock time in Unix epoch milliseconds.
    fn now_ms(&self) -> i64;

    /// Monotonic instant for deadline comparisons.
    fn monotonic_now(&self) -> Instant;
}

/// Production clock backed by `SystemTime` and `Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock; both readings move together on `advance`.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

#[derive(Debug, Clone, Copy)]
struct ManualState {
    wall_ms: i64,
    monotonic: Instant,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            state: Mutex::new(ManualState {
                wall_ms: start_ms,
                monotonic: Instant::now(),
            }),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.wall_ms = state
            .wall_ms
            .saturating_add(i64::try_from(by.as_millis()).unwrap_or(i64::MAX));
        state.monotonic += by;
    }

    /// Moves wall-clock time only, leaving the monotonic reading alone.
    pub fn set_wall_ms(&self, wall_ms: i64) {
        self.lock().wall_ms = wall_ms;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // A poisoned clock still holds a valid reading.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.lock().wall_ms
    }

    fn monotonic_now(&self) -> Instant {
        self.lock().monotonic
    }
}
