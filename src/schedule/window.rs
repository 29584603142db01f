//! Run-window policy: business hours in a fixed civil-time zone.
//!
//! Audits measure page performance, so they are confined to working hours
//! of the designated region where traffic is typical. The policy is a pure
//! predicate over a supplied instant; it is re-evaluated on every
//! scheduling decision and never cached.

use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};

/// Decides whether a given civil-time instant falls inside the run window.
///
/// The window is a closed hour interval on weekdays; Saturday and Sunday
/// are always outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindowPolicy {
    start_hour: u32,
    end_hour: u32,
}

impl TimeWindowPolicy {
    /// Creates a policy for the closed interval `[start_hour, end_hour]`.
    ///
    /// Invalid bounds are a configuration error and fatal at startup.
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self> {
        if start_hour > 23 || end_hour > 23 {
            bail!(
                "run window hours must be within 0-23 (got {}-{})",
                start_hour,
                end_hour
            );
        }
        if start_hour > end_hour {
            bail!(
                "run window start hour {} is after end hour {}",
                start_hour,
                end_hour
            );
        }

        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    /// Returns true iff `now` is a weekday with an hour inside the window.
    pub fn is_run_window(&self, now: DateTime<FixedOffset>) -> bool {
        if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }

        let hour = now.hour();
        hour >= self.start_hour && hour <= self.end_hour
    }
}

/// Source of "now" in the designated zone.
///
/// The policy itself is pure; the scheduler reads the clock through this
/// trait so tests can script the passage of time.
pub trait Clock {
    /// The current instant in the designated civil-time zone.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock translated into a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Creates a clock for the given UTC offset in whole hours.
    ///
    /// An offset outside the valid range is fatal at startup.
    pub fn with_utc_offset_hours(hours: i32) -> Result<Self> {
        match FixedOffset::east_opt(hours * 3600) {
            Some(offset) => Ok(Self { offset }),
            None => bail!("invalid UTC offset: {} hours", hours),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn zone() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    /// 2026-08-03 is a Monday; 2026-08-01/02 are the weekend before it.
    fn at(day: u32, hour: u32) -> DateTime<FixedOffset> {
        zone().with_ymd_and_hms(2026, 8, day, hour, 30, 0).unwrap()
    }

    fn policy() -> TimeWindowPolicy {
        TimeWindowPolicy::new(9, 18).unwrap()
    }

    #[test]
    fn test_weekday_inside_window() {
        assert!(policy().is_run_window(at(3, 9)));
        assert!(policy().is_run_window(at(3, 12)));
        assert!(policy().is_run_window(at(3, 18)));
    }

    #[test]
    fn test_weekday_outside_window() {
        assert!(!policy().is_run_window(at(3, 8)));
        assert!(!policy().is_run_window(at(3, 19)));
        assert!(!policy().is_run_window(at(3, 0)));
        assert!(!policy().is_run_window(at(3, 23)));
    }

    #[test]
    fn test_weekend_rejected_at_any_hour() {
        for hour in 0..24 {
            assert!(!policy().is_run_window(at(1, hour)), "Saturday {}h", hour);
            assert!(!policy().is_run_window(at(2, hour)), "Sunday {}h", hour);
        }
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(TimeWindowPolicy::new(9, 24).is_err());
        assert!(TimeWindowPolicy::new(25, 26).is_err());
        assert!(TimeWindowPolicy::new(18, 9).is_err());
    }

    #[test]
    fn test_system_clock_offset() {
        let clock = SystemClock::with_utc_offset_hours(2).unwrap();
        assert_eq!(clock.now().offset(), &zone());

        assert!(SystemClock::with_utc_offset_hours(30).is_err());
    }
}
