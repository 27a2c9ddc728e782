//! Time source.
//!
//! Handlers and the reminder sweep read the current instant through this
//! trait so tests can pin and advance time.

use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for testing.
pub mod mock {
    use super::*;
    use chrono::Duration;
    use std::sync::Mutex;

    /// Clock that returns a settable instant.
    #[derive(Debug)]
    pub struct FixedClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        /// Move the clock to an absolute instant.
        pub fn set(&self, now: DateTime<Utc>) {
            *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut guard = self.now.lock().unwrap_or_else(|p| p.into_inner());
            *guard += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(|p| p.into_inner())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::FixedClock;
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_fixed_clock_set_and_advance() {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(15));
        assert_eq!(clock.now(), start + Duration::minutes(15));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
