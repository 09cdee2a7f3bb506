//! Time sources for damage timestamps.
//!
//! Every [`DamageRecord`](crate::record::DamageRecord) is stamped with the
//! value of [`Clock::now`] at the moment of the hit. Clocks must never run
//! backwards within a process: the most-recent ranking relies on it.
//!
//! - [`SystemClock`] -- wall clock at millisecond resolution with a
//!   high-water mark, so an NTP step backwards cannot reorder hits.
//! - [`ManualClock`] -- deterministic clock for tests and scenario replays.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};

/// A source of non-decreasing timestamps.
pub trait Clock: core::fmt::Debug + Send + Sync {
    /// Return the current time. Never earlier than any previous result.
    fn now(&self) -> DateTime<Utc>;
}

/// Convert epoch milliseconds back into a timestamp.
///
/// Values outside chrono's range collapse to the epoch; no realistic clock
/// reaches them.
fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Wall clock with a monotonic guard.
#[derive(Debug, Default)]
pub struct SystemClock {
    /// Largest millisecond value handed out so far.
    high_water_ms: AtomicI64,
}

impl SystemClock {
    /// Create a new system clock.
    pub const fn new() -> Self {
        Self {
            high_water_ms: AtomicI64::new(0),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall_ms = Utc::now().timestamp_millis();
        let previous = self.high_water_ms.fetch_max(wall_ms, Ordering::AcqRel);
        from_millis(previous.max(wall_ms))
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current time in epoch milliseconds.
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a manual clock frozen at the given epoch millisecond.
    pub const fn at_millis(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Create a manual clock frozen at the given instant.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self::at_millis(start.timestamp_millis())
    }

    /// Move the clock forward. Negative deltas are ignored.
    pub fn advance(&self, delta: TimeDelta) {
        let step = delta.num_milliseconds();
        if step <= 0 {
            return;
        }
        // fetch_update only fails when the closure returns None.
        let _ = self
            .millis
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(step))
            });
    }

    /// Jump to `instant` if it is later than the current time.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis
            .fetch_max(instant.timestamp_millis(), Ordering::AcqRel);
    }

    /// Current time in epoch milliseconds.
    pub fn millis(&self) -> i64 {
        self.millis.load(Ordering::Acquire)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        from_millis(self.millis())
    }
}
