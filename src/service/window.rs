//! Relative time windows over stored timestamps.
//!
//! Timestamps are stored as `DD-MM-YYYY HH:MM:SS` local wall-clock time with no
//! offset; they are read in the service's configured time zone, daylight
//! saving included. Month and year windows are calendar-naive: 30 and 360 days.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TelemetryError};
use crate::storage::Record;

pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

pub const MONTH_DAYS: i64 = 30;
pub const YEAR_DAYS: i64 = 12 * MONTH_DAYS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Window {
    pub const ALL: [Window; 5] = [
        Window::Hour,
        Window::Day,
        Window::Week,
        Window::Month,
        Window::Year,
    ];

    pub fn duration(self) -> Duration {
        match self {
            Window::Hour => Duration::hours(1),
            Window::Day => Duration::hours(24),
            Window::Week => Duration::weeks(1),
            Window::Month => Duration::days(MONTH_DAYS),
            Window::Year => Duration::days(YEAR_DAYS),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Window::Hour => "hour",
            Window::Day => "day",
            Window::Week => "week",
            Window::Month => "month",
            Window::Year => "year",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Window::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| format!("unknown window `{s}`"))
    }
}

/// Read a stored timestamp as wall-clock time in `tz`.
///
/// A time repeated when clocks go back resolves to its first occurrence. A time
/// skipped when clocks go forward never happened there and does not parse.
pub fn parse_timestamp(value: &str, tz: Tz) -> Result<DateTime<Tz>> {
    let unparseable = || TelemetryError::UnparseableTimestamp {
        value: value.to_string(),
    };
    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| unparseable())?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(unparseable)
}

/// Whether `value` is in the stored timestamp format, independent of zone.
pub fn is_valid_timestamp(value: &str) -> bool {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).is_ok()
}

pub fn format_timestamp(at: &DateTime<Tz>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Keep the records stamped within `[reference - duration, reference]`.
///
/// A record whose timestamp does not parse is dropped with a warning; the rest
/// of the selection is unaffected.
pub fn select_window(
    records: Vec<Record>,
    reference: DateTime<Tz>,
    duration: Duration,
) -> Vec<Record> {
    let threshold = reference - duration;
    let tz = reference.timezone();
    records
        .into_iter()
        .filter(|record| match parse_timestamp(&record.timestamp, tz) {
            Ok(ts) => threshold <= ts && ts <= reference,
            Err(err) => {
                warn!(id = %record.id, error = %err, "skipping record with unparseable timestamp");
                false
            }
        })
        .collect()
}
