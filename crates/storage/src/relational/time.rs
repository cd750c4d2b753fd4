//! Calendar-time conversion for the relational backend
//!
//! Clients send timestamps as milliseconds since the reference epoch
//! `2001-01-01T00:00:00Z`. The relational tables store RFC 3339 strings with
//! millisecond precision so they sort and read naturally in SQL.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use stepline_core::{Error, Result};

/// Reference epoch in milliseconds since the Unix epoch
pub const REFERENCE_EPOCH_MILLIS: i64 = 978_307_200_000;

/// Convert a reference-epoch offset into an RFC 3339 UTC string
pub fn to_calendar_time(offset_millis: i64) -> Result<String> {
    let unix_millis = REFERENCE_EPOCH_MILLIS
        .checked_add(offset_millis)
        .ok_or_else(|| out_of_range(offset_millis))?;
    let at = Utc
        .timestamp_millis_opt(unix_millis)
        .single()
        .ok_or_else(|| out_of_range(offset_millis))?;
    Ok(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Convert an RFC 3339 string back into a reference-epoch offset
pub fn from_calendar_time(text: &str) -> Result<i64> {
    let at = DateTime::parse_from_rfc3339(text)
        .map_err(|e| Error::Corruption(format!("bad stored time {:?}: {}", text, e)))?;
    Ok(at.timestamp_millis() - REFERENCE_EPOCH_MILLIS)
}

fn out_of_range(offset_millis: i64) -> Error {
    Error::Storage(format!("timestamp {} is out of range", offset_millis))
}
