//! Date normalization for uploaded rows.
//!
//! Uploads carry dates in whatever shape the source spreadsheet produced:
//! native date-time cells, ISO strings with or without a time component,
//! compact `YYYYMMDD`, US `MM/DD/YYYY`, or European `DD.MM.YYYY`. Everything
//! is normalized to a canonical `YYYY-MM-DD` string.

use crate::error::{Error, Result};
use crate::models::CellValue;
use chrono::{NaiveDate, NaiveDateTime};

const OUTPUT_FORMAT: &str = "%Y-%m-%d";

/// Known textual formats, tried in priority order.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Normalize a cell of unknown representation to a `YYYY-MM-DD` string.
///
/// Failure is fatal for the row, never for the batch: callers skip the row
/// and count it as invalid.
pub fn normalize_date(value: &CellValue) -> Result<String> {
    if let CellValue::DateTime(dt) = value {
        return Ok(dt.format(OUTPUT_FORMAT).to_string());
    }

    let text = value.to_text();
    let trimmed = text.trim();

    if let Some(date) = try_known_formats(trimmed) {
        return Ok(date.format(OUTPUT_FORMAT).to_string());
    }

    // A trailing time component in an unknown shape: retry the part before
    // the first space as a plain ISO date.
    if let Some((prefix, _)) = trimmed.split_once(' ') {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Ok(date.format(OUTPUT_FORMAT).to_string());
        }
    }

    Err(Error::DateParse(trimmed.to_string()))
}

fn try_known_formats(text: &str) -> Option<NaiveDate> {
    // `%Y-%m-%d %H:%M:%S` first, then plain dates, then fractional seconds,
    // mirroring the upload formats seen in practice.
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, DATETIME_FORMATS[0]) {
        return Some(dt.date());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, DATETIME_FORMATS[1]) {
        return Some(dt.date());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_all_supported_formats_normalize_identically() {
        let inputs = [
            "2025-08-06 00:00:00",
            "2025-08-06",
            "20250806",
            "08/06/2025",
            "06.08.2025",
            "2025-08-06 00:00:00.000",
        ];
        for input in inputs {
            assert_eq!(
                normalize_date(&text(input)).unwrap(),
                "2025-08-06",
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_native_datetime_cell() {
        let dt = NaiveDate::from_ymd_opt(2025, 8, 6)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(normalize_date(&CellValue::DateTime(dt)).unwrap(), "2025-08-06");
    }

    #[test]
    fn test_numeric_compact_date_cell() {
        assert_eq!(
            normalize_date(&CellValue::Number(20250806.0)).unwrap(),
            "2025-08-06"
        );
    }

    #[test]
    fn test_space_fallback_takes_date_prefix() {
        assert_eq!(
            normalize_date(&text("2025-08-06 garbage")).unwrap(),
            "2025-08-06"
        );
    }

    #[test]
    fn test_unsupported_pattern_fails() {
        let err = normalize_date(&text("06-08-2025")).unwrap_err();
        assert!(matches!(err, Error::DateParse(_)));

        assert!(normalize_date(&text("not a date")).is_err());
        assert!(normalize_date(&text("")).is_err());
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(normalize_date(&text("  2025-08-06  ")).unwrap(), "2025-08-06");
    }
}
