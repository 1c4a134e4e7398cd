//! Lenient column parsing for backend rows.
//!
//! Rows written by older clients carry naive ISO timestamps without an
//! offset, and some deployments store due dates as full timestamps. Anything
//! that cannot be read becomes `None`, and a `null` in a required column
//! becomes its default, so a single malformed cell never fails a whole
//! table load.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Parse a timestamp in RFC 3339, naive ISO (assumed UTC) or bare-date form.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Postgres `timestamptz` text form: "2025-01-02 10:00:00+00"
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a calendar date, accepting a full timestamp and keeping its date.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date_naive()))
}

/// Serde adapter for `Option<DateTime<Utc>>` columns.
///
/// # Errors
///
/// Only fails if the underlying value is neither a string nor null.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Serde adapter reading `null` as `T::default()`.
///
/// `#[serde(default)]` alone only covers a missing key.
///
/// # Errors
///
/// Fails if the value is present but not a `T`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Serde adapter for `Option<NaiveDate>` columns.
///
/// # Errors
///
/// Only fails if the underlying value is neither a string nor null.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc3339() {
        let ts = parse_timestamp("2025-02-10T13:45:00-03:00").unwrap();
        assert_eq!(ts.hour(), 16);
    }

    #[test]
    fn test_parse_naive_iso_as_utc() {
        let ts = parse_timestamp("2025-02-10T13:45:00.123456").unwrap();
        assert_eq!(ts.day(), 10);
        assert_eq!(ts.hour(), 13);
    }

    #[test]
    fn test_parse_postgres_text_form() {
        let ts = parse_timestamp("2025-02-10 13:45:00+00").unwrap();
        assert_eq!(ts.minute(), 45);
    }

    #[test]
    fn test_parse_bare_date() {
        let ts = parse_timestamp("2025-02-10").unwrap();
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn test_garbage_is_none() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_parse_date_from_timestamp() {
        let date = parse_date("2025-04-30T00:00:00").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());
    }
}
