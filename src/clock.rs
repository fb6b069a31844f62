//! Injectable time source.
//!
//! Window and period rollover depend on wall-clock time, so the engine never
//! reads the system clock directly. Production code uses [`SystemClock`];
//! tests drive rollover deterministically with [`ManualClock`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Wall-clock time source for window and period calculations.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as whole seconds since the Unix epoch.
    fn epoch_secs(&self) -> i64 {
        self.now().timestamp()
    }
}

/// System clock implementation using `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Controllable clock for deterministic rollover tests.
///
/// Clones share the same underlying time value, so advancing one clone
/// is visible through all of them.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a manual clock starting at the given instant.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a manual clock starting at the given epoch second.
    pub fn at_epoch(epoch_secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(epoch_secs, 0).unwrap_or_default())
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut current = self.current.lock();
        *current += duration;
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock::new();
        let t1 = clock.now();
        let t2 = clock.now();
        assert!(t2 >= t1);
    }

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::at_epoch(1_700_000_000);
        assert_eq!(clock.epoch_secs(), 1_700_000_000);

        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(clock.epoch_secs(), 1_700_000_090);

        let target = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::at_epoch(1_700_000_000);
        let clone = clock.clone();

        clone.advance(chrono::Duration::seconds(5));
        assert_eq!(clock.epoch_secs(), 1_700_000_005);
    }

    #[test]
    fn test_subsecond_advance_rounds_down() {
        let clock = ManualClock::at_epoch(1_700_000_000);
        clock.advance(chrono::Duration::milliseconds(900));
        assert_eq!(clock.epoch_secs(), 1_700_000_000);

        clock.advance(chrono::Duration::milliseconds(200));
        assert_eq!(clock.epoch_secs(), 1_700_000_001);
    }
}
