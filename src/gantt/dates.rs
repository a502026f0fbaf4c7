//! Date normalization.
//!
//! The Gantt widget and older data files carry dates in several shapes:
//! `YYYY-MM-DD`, `YYYY-MM-DD HH:mm[:ss]`, full RFC 3339 timestamps, and
//! epoch milliseconds. Everything is folded into one canonical form: RFC 3339
//! in UTC with a `Z` suffix, whole seconds, and a fractional part only when
//! it is non-zero.
//!
//! Parsing never fails; unparseable input normalizes to `None`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Zone-less date-time layouts, read as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Normalize a raw date value to its canonical string.
#[must_use]
pub fn normalize(value: &Value) -> Option<String> {
    parse_value(value).map(format_canonical)
}

/// Parse a raw date value.
///
/// Strings go through [`parse_text`]; numbers are epoch milliseconds.
/// Falsy values (`null`, `""`, `0`, `false`) and any other JSON type give
/// `None`.
#[must_use]
pub fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_text(text),
        Value::Number(number) => {
            #[allow(clippy::cast_possible_truncation)]
            let millis = number.as_i64().or_else(|| number.as_f64().map(|f| f as i64))?;
            if millis == 0 {
                return None;
            }
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

/// Parse a date string.
#[must_use]
pub fn parse_text(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc());
    }

    // "2024-01-10 08:00:00" uses a space where ISO wants a 'T'.
    let text = if text.contains('T') { text.to_string() } else { text.replacen(' ', "T", 1) };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = text.strip_suffix(&['Z', 'z'][..]).unwrap_or(&text);
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(parsed.and_utc());
        }
    }

    DateTime::parse_from_rfc2822(raw.trim()).ok().map(|parsed| parsed.with_timezone(&Utc))
}

/// Render a timestamp in canonical form.
#[must_use]
pub fn format_canonical(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Shift a timestamp by a (possibly fractional) number of days.
#[must_use]
pub fn add_days(timestamp: DateTime<Utc>, days: f64) -> Option<DateTime<Utc>> {
    if !days.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = (days * MILLIS_PER_DAY).round() as i64;
    timestamp.checked_add_signed(Duration::try_milliseconds(millis)?)
}

/// Normalize a start/end pair, filling a missing side from the other one
/// plus `duration_days`.
///
/// Returns the canonical `(start, end)`; either side stays `None` when it
/// can be neither parsed nor derived.
#[must_use]
pub fn resolve_span(
    start: Option<&Value>,
    end: Option<&Value>,
    duration_days: Option<f64>,
) -> (Option<String>, Option<String>) {
    let mut start = start.and_then(parse_value);
    let mut end = end.and_then(parse_value);

    if let Some(days) = duration_days {
        match (start, end) {
            (None, Some(end)) => start = add_days(end, -days),
            (Some(start), None) => end = add_days(start, days),
            _ => {}
        }
    }

    (start.map(format_canonical), end.map(format_canonical))
}
