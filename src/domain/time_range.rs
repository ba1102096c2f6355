// Time window the dashboard queries against
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("time range start {start} is after end {end}")]
pub struct InvalidTimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub current: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        current: DateTime<Utc>,
    ) -> Result<Self, InvalidTimeRange> {
        let range = Self {
            start,
            end,
            current,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), InvalidTimeRange> {
        if self.start > self.end {
            return Err(InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Window of `half_width_days` either side of the hour containing `now`.
    pub fn around(now: DateTime<Utc>, half_width_days: i64) -> Self {
        let current = now.duration_trunc(Duration::hours(1)).unwrap_or(now);
        let half_width = Duration::days(half_width_days.max(0));
        Self {
            start: current - half_width,
            end: current + half_width,
            current,
        }
    }

    /// `(start_date, end_date)` for the fetch. Point mode queries the day of
    /// `current` only.
    pub fn fetch_window(&self, range_mode: bool) -> (String, String) {
        if range_mode {
            (format_date_for_api(self.start), format_date_for_api(self.end))
        } else {
            let day = format_date_for_api(self.current);
            (day.clone(), day)
        }
    }
}

pub fn format_date_for_api(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}
