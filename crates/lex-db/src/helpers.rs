//! Row-to-entity parsing helpers.
//!
//! Every repo converts `libsql::Row` (column-indexed) into typed entity
//! structs. These helpers isolate the parsing and the datetime format handling.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DatabaseError;

/// Format a timestamp for storage.
///
/// Fixed microsecond precision keeps the text sortable.
#[must_use]
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Accepts RFC 3339 and `SQLite`'s `datetime('now')` format.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all lex-core enums that use `#[serde(rename_all = "snake_case")]`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Read a 0/1 INTEGER column as `bool`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_bool(row: &libsql::Row, idx: i32) -> Result<bool, DatabaseError> {
    Ok(row.get::<i64>(idx)? != 0)
}

/// Drain a row cursor through `map`.
///
/// # Errors
///
/// Returns the first cursor or mapping error.
pub async fn collect_rows<T>(
    mut rows: libsql::Rows,
    map: impl Fn(&libsql::Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(map(&row)?);
    }
    Ok(out)
}

/// Trim a free-text field and reject it when empty.
///
/// # Errors
///
/// Returns a validation error naming `field`.
pub fn require_text(field: &str, value: &str) -> Result<String, DatabaseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DatabaseError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Convert an `Option<Option<String>>` update field into a bind value.
pub(crate) fn nullable(value: Option<&str>) -> libsql::Value {
    value.map_or(libsql::Value::Null, |v| libsql::Value::Text(v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::enums::PaymentStatus;

    #[test]
    fn datetime_roundtrips_through_storage_format() {
        let now = Utc::now();
        let stored = format_datetime(&now);
        assert!(stored.ends_with('Z'));
        let parsed = parse_datetime(&stored).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn parses_sqlite_default_format() {
        let parsed = parse_datetime("2026-02-09 14:30:00").unwrap();
        assert_eq!(format_datetime(&parsed), "2026-02-09T14:30:00.000000Z");
    }

    #[test]
    fn parse_enum_reads_snake_case() {
        let status: PaymentStatus = parse_enum("cancelled").unwrap();
        assert_eq!(status, PaymentStatus::Cancelled);
        assert!(parse_enum::<PaymentStatus>("refunded").is_err());
    }

    #[test]
    fn optional_datetime_treats_empty_as_none() {
        assert!(parse_optional_datetime(Some("")).unwrap().is_none());
        assert!(parse_optional_datetime(None).unwrap().is_none());
    }

    #[test]
    fn require_text_trims() {
        assert_eq!(require_text("name", "  TOEIC  ").unwrap(), "TOEIC");
        assert!(require_text("name", "   ").is_err());
    }
}
