//! Wall-clock capability
//!
//! The engine never reads the system time directly. Every component takes a
//! [`Clock`], so rate, merge and throttle math can be driven by a
//! [`ManualClock`] in tests and simulations.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::types::MILLIS_PER_SECOND;

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    /// Current time as a millisecond Unix epoch
    fn now_ms(&self) -> i64;

    /// Current time as whole Unix seconds
    fn now_secs(&self) -> i64 {
        self.now_ms().div_euclid(MILLIS_PER_SECOND)
    }
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// System wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<i64>,
}

impl ManualClock {
    /// Create a clock frozen at `start_ms`
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Mutex::new(start_ms),
        }
    }

    /// Move forward by `ms` milliseconds, returning the new time
    pub fn advance_ms(&self, ms: i64) -> i64 {
        let mut now = self.now.lock();
        *now += ms;
        *now
    }

    /// Move forward by whole seconds
    pub fn advance_secs(&self, secs: i64) -> i64 {
        self.advance_ms(secs * MILLIS_PER_SECOND)
    }

    /// Jump to an absolute time (may go backwards)
    pub fn set_ms(&self, ms: i64) {
        *self.now.lock() = ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        *self.now.lock()
    }
}
