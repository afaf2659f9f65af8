//! Controllable Unix clock for reproducible timestamps.

use std::sync::atomic::{AtomicI64, Ordering};

use gas_core::Clock;

/// Clock that only moves when told to.
///
/// Shared through `Arc` so a test can advance time while a tracker holds it.
#[derive(Debug, Default)]
pub struct FixedClock {
    seconds: AtomicI64,
}

impl FixedClock {
    /// Creates a clock stopped at `seconds` since the Unix epoch.
    pub fn new(seconds: i64) -> Self {
        Self {
            seconds: AtomicI64::new(seconds),
        }
    }

    /// Moves the clock to an absolute time.
    pub fn set(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    /// Advances the clock by `seconds`.
    ///
    /// # Panics
    ///
    /// Panics if `seconds` is negative; simulated time never moves backwards.
    pub fn advance(&self, seconds: i64) {
        assert!(seconds >= 0, "Cannot advance time backwards");
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn unix_timestamp(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances_only_on_demand() {
        let clock = FixedClock::new(1_000);
        assert_eq!(clock.unix_timestamp(), 1_000);
        assert_eq!(clock.unix_timestamp(), 1_000);

        clock.advance(5);
        assert_eq!(clock.unix_timestamp(), 1_005);

        clock.set(42);
        assert_eq!(clock.unix_timestamp(), 42);
    }

    #[test]
    #[should_panic(expected = "Cannot advance time backwards")]
    fn test_fixed_clock_rejects_negative_advance() {
        FixedClock::new(10).advance(-1);
    }
}
