//! Combining separate date and time inputs into a single instant.
//!
//! Tasks carry their schedule as a `YYYY-MM-DD` date plus an optional
//! `HH:MM` time. The two are combined as UTC; a missing time means UTC
//! midnight, so date-only tasks sort ahead of anything scheduled later
//! that day regardless of the submitting client's timezone.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid time: {0}")]
    InvalidTime(String),
}

/// Combine a `YYYY-MM-DD` date and an optional `HH:MM` (or `HH:MM:SS`)
/// time into a UTC instant.
pub fn combine_instant(date: &str, time: Option<&str>) -> Result<DateTime<Utc>, ScheduleError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidDate(date.to_string()))?;

    let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(raw) => NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| ScheduleError::InvalidTime(raw.to_string()))?,
        None => NaiveTime::MIN,
    };

    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}
