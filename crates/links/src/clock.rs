//! Time source for expiry checks

use splitvault_types::TimestampMillis;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current time in Unix milliseconds
    fn now(&self) -> TimestampMillis;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampMillis {
        TimestampMillis::now()
    }
}

/// Manually advanced clock, for tests and replay
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Clock frozen at `start`
    pub fn new(start: TimestampMillis) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    /// Jump to `at`
    pub fn set(&self, at: TimestampMillis) {
        self.millis.store(at.as_millis(), Ordering::SeqCst);
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |m| {
                Some(m.saturating_add(by))
            })
            .ok();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimestampMillis {
        TimestampMillis::new(self.millis.load(Ordering::SeqCst))
    }
}
