//! Daily fire-time computation

use chrono::{DateTime, Days, Duration, LocalResult, NaiveTime, TimeZone};
use std::fmt;

/// Fires once per calendar day at a wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    at: NaiveTime,
}

impl DailyTrigger {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// First fire time strictly after `now`.
    ///
    /// Always computed from `now`, so days missed while the process was down
    /// are skipped rather than replayed. A wall-clock time that falls in a DST
    /// gap fires an hour later that day.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        for offset in 0..=2 {
            let Some(date) = now.date_naive().checked_add_days(Days::new(offset)) else {
                break;
            };
            let naive = date.and_time(self.at);
            let candidate = match tz.from_local_datetime(&naive) {
                LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t),
                LocalResult::None => tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest(),
            };
            if let Some(candidate) = candidate.filter(|t| t > now) {
                return candidate;
            }
        }
        now.clone() + Duration::days(1)
    }

    /// How long to sleep from `now` until the next fire time
    pub fn until_next<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> std::time::Duration {
        (self.next_after(now) - now.clone())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

impl fmt::Display for DailyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.at.format("%H:%M"))
    }
}
