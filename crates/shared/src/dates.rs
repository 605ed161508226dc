use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{CurateError, Result};

const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y", "%Y.%m.%d",
];

const ISO_DATETIME_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y%m%d"];

/// Parse an upstream `publish_date` value.
///
/// Tries the fixed day/month/year layouts first, then ISO-8601 datetimes.
/// Empty strings and `unknown` (any case) are "no date", as is anything unparseable.
pub fn parse_publish_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("unknown") {
        return None;
    }

    for fmt in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    // ISO fallback: full RFC 3339 with offset, then naive datetimes
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ISO_DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    None
}

/// Parse a caller-supplied cutoff date (`DD-MM-YYYY`, or `YYYY-MM-DD`).
pub fn parse_cutoff_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| CurateError::InvalidDate(raw.to_string()))
}
