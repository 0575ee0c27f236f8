//! Time utility functions
//!
//! Voice-agent SDKs report timestamps inconsistently: float seconds from
//! `time.time()`, integer milliseconds from JS clients, or ISO 8601 strings.
//! Everything inside the crate works on epoch milliseconds (`f64`); the
//! conversion happens once, at the ingestion boundary, through
//! [`TimestampValue::to_epoch_millis`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Values above this are treated as milliseconds, below as seconds.
///
/// 1e12 ms is September 2001; 1e12 s is ~31,700 years from now, so the two
/// ranges never overlap for real call data.
pub const MILLIS_THRESHOLD: f64 = 1e12;

/// A timestamp as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    Number(f64),
    Text(String),
}

impl TimestampValue {
    /// Normalize to epoch milliseconds.
    ///
    /// Returns `None` for unparsable strings and non-finite numbers.
    pub fn to_epoch_millis(&self) -> Option<f64> {
        match self {
            TimestampValue::Number(n) => number_to_epoch_millis(*n),
            TimestampValue::Text(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<f64>() {
                    return number_to_epoch_millis(n);
                }
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc).timestamp_millis() as f64)
                    .map_err(|_| tracing::debug!(ts = s, "Unparsable timestamp"))
                    .ok()
            }
        }
    }
}

impl From<f64> for TimestampValue {
    fn from(value: f64) -> Self {
        TimestampValue::Number(value)
    }
}

/// Convert a bare number (seconds or milliseconds) to epoch milliseconds
pub fn number_to_epoch_millis(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    if value.abs() > MILLIS_THRESHOLD {
        Some(value)
    } else {
        Some(value * 1000.0)
    }
}

/// Convert epoch milliseconds to an ISO 8601 string (millisecond precision)
pub fn millis_to_iso(millis: f64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis.round() as i64)
        .unwrap_or_else(|| {
            tracing::warn!(millis, "Invalid timestamp, using epoch");
            DateTime::UNIX_EPOCH
        })
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Format a millisecond duration for timeline labels: `250ms`, `1.5s`, `2m 05s`
pub fn format_duration_ms(ms: f64) -> String {
    let ms = ms.max(0.0);
    if ms < 1000.0 {
        format!("{}ms", ms.round() as i64)
    } else if ms < 60_000.0 {
        let tenths = (ms / 100.0).round() as i64;
        if tenths % 10 == 0 {
            format!("{}s", tenths / 10)
        } else {
            format!("{}.{}s", tenths / 10, tenths % 10)
        }
    } else {
        let total_secs = (ms / 1000.0).round() as i64;
        format!("{}m {:02}s", total_secs / 60, total_secs % 60)
    }
}
