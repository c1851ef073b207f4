//! Normalization of loosely-typed ERP attribute values.
//!
//! Upstream records encode flags as `1`, `"1"`, booleans or nothing at all,
//! numbers as JSON numbers or numeric strings, and dates in several textual
//! layouts. Every read of such an attribute goes through one of these helpers;
//! none of them fail, they fall back to a disabled / absent value instead.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// A candidate layout for textual dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateFormat {
    Date(&'static str),
    DateTime(&'static str),
}

/// Tried in order, first success wins. `%Y-%m-%d` must stay ahead of
/// `%d-%m-%Y` so that the two never swap day and month.
const DATE_FORMATS: &[DateFormat] = &[
    DateFormat::Date("%Y-%m-%d"),
    DateFormat::DateTime("%Y-%m-%d %H:%M:%S"),
    DateFormat::Date("%d-%m-%Y"),
    // Serialized date+time values with fractional seconds or a `T` separator.
    DateFormat::DateTime("%Y-%m-%d %H:%M:%S%.f"),
    DateFormat::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
];

/// Returns true only for an explicitly enabled flag: `true`, the number one
/// (`1` or `1.0`), `"1"`, `"true"` or `"yes"` (case-insensitive). Everything
/// else, including a missing value and the string `"1.0"`, is disabled.
pub fn to_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(enabled)) => *enabled,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes")
        }
        _ => false,
    }
}

/// Best-effort numeric coercion. Non-numeric, empty and non-finite inputs
/// yield `None`.
pub fn to_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    n.is_finite().then_some(n)
}

/// Parses a date attribute. A date+time is truncated to its date.
pub fn to_date(value: Option<&Value>) -> Option<NaiveDate> {
    match value? {
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

/// Parses text against [`DATE_FORMATS`] in order.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_FORMATS.iter().find_map(|format| match format {
        DateFormat::Date(f) => NaiveDate::parse_from_str(text, f).ok(),
        DateFormat::DateTime(f) => NaiveDateTime::parse_from_str(text, f)
            .ok()
            .map(|dt| dt.date()),
    })
}

/// Non-empty textual form of a value. Numbers are rendered, everything
/// else that is not a string is treated as absent.
pub fn to_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
