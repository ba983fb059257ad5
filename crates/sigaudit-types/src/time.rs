use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TimeRangeError;

pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeRangeError> {
        if start >= end {
            return Err(TimeRangeError::Inverted {
                start: start.format(NAIVE_FORMAT).to_string(),
                end: end.format(NAIVE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Build a range from optional caller input.
    ///
    /// `end` defaults to `now`, `start` to 24 hours before `end`.
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, TimeRangeError> {
        let end = match end {
            Some(raw) => parse_timestamp(raw)?,
            None => now,
        };
        let start = match start {
            Some(raw) => parse_timestamp(raw)?,
            None => end - Duration::hours(DEFAULT_LOOKBACK_HOURS),
        };
        Self::new(start, end)
    }

    pub fn unix_start(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn unix_end(&self) -> i64 {
        self.end.timestamp()
    }
}

/// Unix seconds, `YYYY-MM-DD HH:MM:SS` (UTC) or RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimeRangeError> {
    let trimmed = raw.trim();
    let invalid = || TimeRangeError::InvalidTimestamp(raw.to_string());

    if let Ok(secs) = trimmed.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single().ok_or_else(invalid);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, NAIVE_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid())
}
