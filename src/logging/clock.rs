//! Wall-clock source for file naming, timestamps, and age checks

use chrono::{DateTime, Local};

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fixed::FixedClock;

#[cfg(any(test, feature = "test-support"))]
mod fixed {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};

    use super::Clock;

    /// A clock that only moves when told to
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        now: Arc<Mutex<DateTime<Local>>>,
    }

    impl FixedClock {
        pub fn new(now: DateTime<Local>) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        /// Noon local time on the given day
        pub fn at_date(year: i32, month: u32, day: u32) -> Self {
            let naive = NaiveDate::from_ymd_opt(year, month, day)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap_or_default();
            let now = Local
                .from_local_datetime(&naive)
                .earliest()
                .unwrap_or_else(Local::now);
            Self::new(now)
        }

        pub fn set(&self, now: DateTime<Local>) {
            *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
            *now += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            *self.now.lock().unwrap_or_else(|e| e.into_inner())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration};

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at_date(2024, 3, 13);
        assert_eq!(clock.now().day(), 13);
        clock.advance(Duration::days(1));
        assert_eq!(clock.now().day(), 14);
    }
}
