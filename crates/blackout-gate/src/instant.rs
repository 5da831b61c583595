//! Reference-instant parsing for callers that receive `now` as text.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{GateError, Result};

/// Parse a reference instant into `DateTime<Utc>`.
///
/// Accepts RFC 3339 with an offset (`2026-03-01T09:30:00+01:00`), naive ISO
/// 8601 (`2026-03-01T09:30:00`, read as UTC), and iCalendar basic UTC form
/// (`20260301T093000Z`).
///
/// # Errors
/// Returns `GateError::InvalidTimestamp` if none of the formats match.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(basic) = s.strip_suffix('Z') {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(basic, "%Y%m%dT%H%M%S") {
            return Ok(ndt.and_utc());
        }
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| GateError::InvalidTimestamp(format!("'{}': {}", s, e)))
}
