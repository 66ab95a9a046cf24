use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CwLensError, Result};

pub const DEFAULT_HOURS: i64 = 24;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Millisecond-epoch query window. Built once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// `timeRange` object included in analysis responses.
    pub fn describe(&self, hours: i64) -> serde_json::Value {
        serde_json::json!({
            "start": format_epoch_millis(self.start_ms),
            "end": format_epoch_millis(self.end_ms),
            "hours": hours,
        })
    }
}

/// Time bounds as callers supply them: hours back, optionally overridden by
/// explicit ISO8601 bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRangeArgs {
    #[serde(default = "default_hours")]
    pub hours: i64,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

fn default_hours() -> i64 {
    DEFAULT_HOURS
}

impl Default for TimeRangeArgs {
    fn default() -> Self {
        Self::hours(DEFAULT_HOURS)
    }
}

impl TimeRangeArgs {
    pub fn hours(hours: i64) -> Self {
        Self {
            hours,
            start_time: None,
            end_time: None,
        }
    }

    pub fn with_bounds(mut self, start_time: Option<String>, end_time: Option<String>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn resolve(&self) -> Result<TimeWindow> {
        resolve(self.hours, self.start_time.as_deref(), self.end_time.as_deref())
    }
}

/// Resolve a window against the current clock.
pub fn resolve(hours: i64, start_time: Option<&str>, end_time: Option<&str>) -> Result<TimeWindow> {
    resolve_at(Utc::now(), hours, start_time, end_time)
}

/// Resolve a window against an explicit clock reading.
///
/// Explicit bounds always win over the hours-derived ones. An inverted range is
/// returned as is; the backing service rejects it.
pub fn resolve_at(
    now: DateTime<Utc>,
    hours: i64,
    start_time: Option<&str>,
    end_time: Option<&str>,
) -> Result<TimeWindow> {
    let start = match start_time {
        Some(raw) => parse_iso8601(raw)?,
        None => Duration::try_hours(hours)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| {
                CwLensError::invalid_input(format!("hours out of range: {}", hours))
            })?,
    };
    let end = match end_time {
        Some(raw) => parse_iso8601(raw)?,
        None => now,
    };

    Ok(TimeWindow::new(start.timestamp_millis(), end.timestamp_millis()))
}

/// Parse an ISO8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_iso8601(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| invalid_time(raw, "date has no midnight")),
        Err(e) => Err(invalid_time(raw, &e.to_string())),
    }
}

fn invalid_time(raw: &str, reason: &str) -> CwLensError {
    CwLensError::InvalidTimeFormat {
        input: raw.to_string(),
        reason: reason.to_string(),
    }
}

/// Render a millisecond epoch as an ISO8601 UTC string.
pub fn format_epoch_millis(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ms.to_string(),
    }
}
