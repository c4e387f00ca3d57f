//! Environment clock
//!
//! All time comparisons in the ledger, vesting and payroll code go through a
//! [`Clock`]. Callers never pass timestamps in directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::primitives::Timestamp;

/// Seconds in one day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Monotonically non-decreasing timestamp source
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch
    fn now(&self) -> Timestamp;
}

/// Wall clock, clamped so that it never runs backwards
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wall clock that never reports a time before `floor`
    ///
    /// Used to carry the last observed time across process restarts.
    pub fn starting_at(floor: Timestamp) -> Self {
        Self {
            last: AtomicU64::new(floor),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

/// Manually driven clock for tests and offline tooling
///
/// `set` and `advance` only ever move time forward.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move to `timestamp`, ignoring attempts to go back in time
    pub fn set(&self, timestamp: Timestamp) {
        self.now.fetch_max(timestamp, Ordering::SeqCst);
    }

    /// Move forward by `seconds`
    pub fn advance(&self, seconds: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(seconds))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_never_goes_back() {
        let clock = ManualClock::new(1_000);
        clock.advance(50);
        assert_eq!(clock.now(), 1_050);

        clock.set(10);
        assert_eq!(clock.now(), 1_050);

        clock.set(2_000);
        assert_eq!(clock.now(), 2_000);
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::new(u64::MAX - 1);
        clock.advance(10);
        assert_eq!(clock.now(), u64::MAX);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
        assert!(first > 0);
    }

    #[test]
    fn test_system_clock_respects_floor() {
        let far_future = u64::MAX / 2;
        let clock = SystemClock::starting_at(far_future);
        assert_eq!(clock.now(), far_future);

        let past = SystemClock::starting_at(1);
        assert!(past.now() > 1);
    }
}
