//! Heuristic timestamp normalization
//!
//! Date-like fields arrive as ISO strings, several formatted date strings,
//! or bare numbers in seconds, milliseconds or microseconds. No value carries
//! a format tag, so the shape is guessed from magnitude and pattern. The
//! canonical output is whole Unix seconds in `[1, 2147483647]`.
//!
//! Order of attempts (first success wins):
//! 1. null / empty string: not convertible
//! 2. numbers: classified by magnitude (µs, ms, s)
//! 3. numeric strings: seconds or ms inside the 2000..2038 window
//! 4. strict formatted date strings ([`FormatSet`])
//! 5. free-form ISO-8601 / RFC 2822 parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Lowest valid normalized value
pub const MIN_SECONDS: i64 = 1;
/// 32-bit signed seconds ceiling (2038-01-19T03:14:07Z)
pub const MAX_SECONDS: i64 = 2_147_483_647;
/// 2000-01-01T00:00:00Z, lower bound of the numeric-string window
pub const SANITY_FLOOR_SECONDS: i64 = 946_684_800;

/// Numbers above this are microseconds
const MICROS_THRESHOLD: i64 = 999_999_999_999_999;
/// Numbers above this are milliseconds
const MILLIS_THRESHOLD: i64 = 9_999_999_999;

/// Date-only formats tried by every policy
const STANDARD_DATES: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];
/// Date-time formats tried by every policy
const STANDARD_DATE_TIMES: &[&str] = &["%Y-%m-%d %H:%M:%S"];

/// Looser date-only formats used when sweeping every field
const EXTENDED_DATES: &[&str] = &[
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%B %d, %Y",
    "%d %B %Y",
];
/// Looser date-time formats used when sweeping every field
const EXTENDED_DATE_TIMES: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Naive ISO-like date-times for the free-form fallback (read as UTC)
const FREEFORM_NAIVE: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Which formatted-date patterns to try
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatSet {
    /// `YYYY-MM-DD`, `YYYY-MM-DD HH:mm:ss`, `MM/DD/YYYY`, `DD/MM/YYYY`, `YYYY/MM/DD`
    #[default]
    Standard,
    /// Standard plus looser separator and month-name variants
    Extended,
}

/// Normalize a JSON value to Unix seconds using the standard formats
pub fn normalize(value: &Value) -> Option<i64> {
    normalize_with(value, FormatSet::Standard)
}

/// Normalize a JSON value to Unix seconds
///
/// Returns `None` for null, empty strings, non-scalar values and anything
/// that cannot be read as a plausible timestamp. Callers must treat `None`
/// as "unconvertible", never as zero.
pub fn normalize_with(value: &Value, formats: FormatSet) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                normalize_integer(i)
            } else {
                n.as_f64().and_then(normalize_number)
            }
        }
        Value::String(s) => normalize_str(s, formats),
        _ => None,
    }
}

/// Classify an integer by magnitude and reduce it to seconds
pub fn normalize_integer(n: i64) -> Option<i64> {
    if n <= 0 {
        return None;
    }
    let seconds = if n > MICROS_THRESHOLD {
        n / 1_000_000
    } else if n > MILLIS_THRESHOLD {
        let ms = n / 1_000;
        // Past the ms ceiling only a microsecond reading inside the 2000..2038
        // window is accepted; anything else is rejected
        if ms > MAX_SECONDS {
            let micros = n / 1_000_000;
            if micros < SANITY_FLOOR_SECONDS {
                return None;
            }
            micros
        } else {
            ms
        }
    } else {
        n
    };
    in_range(seconds)
}

/// Classify a float by magnitude and reduce it to whole seconds
pub fn normalize_number(n: f64) -> Option<i64> {
    if !n.is_finite() || n <= 0.0 {
        return None;
    }
    let seconds = if n > MICROS_THRESHOLD as f64 {
        (n / 1_000_000.0).floor()
    } else if n > MILLIS_THRESHOLD as f64 {
        let ms = (n / 1_000.0).floor();
        if ms > MAX_SECONDS as f64 {
            let micros = (n / 1_000_000.0).floor();
            if micros < SANITY_FLOOR_SECONDS as f64 {
                return None;
            }
            micros
        } else {
            ms
        }
    } else {
        n.floor()
    };
    if seconds > MAX_SECONDS as f64 {
        return None;
    }
    in_range(seconds as i64)
}

/// Normalize a string value
pub fn normalize_str(raw: &str, formats: FormatSet) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(seconds) = numeric_string_seconds(trimmed) {
        return Some(seconds);
    }

    parse_date_millis_with(trimmed, formats).and_then(|ms| in_range(ms.div_euclid(1_000)))
}

/// Parse a formatted or free-form date string to epoch milliseconds (UTC)
pub fn parse_date_millis(raw: &str) -> Option<i64> {
    parse_date_millis_with(raw, FormatSet::Standard)
}

/// Parse a formatted or free-form date string to epoch milliseconds (UTC)
pub fn parse_date_millis_with(raw: &str, formats: FormatSet) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_formatted(s, STANDARD_DATE_TIMES, STANDARD_DATES)
        .or_else(|| match formats {
            FormatSet::Standard => None,
            FormatSet::Extended => parse_formatted(s, EXTENDED_DATE_TIMES, EXTENDED_DATES),
        })
        .or_else(|| parse_freeform(s))
}

/// True when `original` was already a number in `(0, MAX_SECONDS]` equal
/// to `converted`, meaning no write is needed.
pub fn is_already_normalized(original: &Value, converted: i64) -> bool {
    match original {
        Value::Number(n) => match n.as_f64() {
            Some(v) => v > 0.0 && v <= MAX_SECONDS as f64 && v == converted as f64,
            None => false,
        },
        _ => false,
    }
}

fn in_range(seconds: i64) -> Option<i64> {
    (MIN_SECONDS..=MAX_SECONDS).contains(&seconds).then_some(seconds)
}

/// Bare numeric strings count only inside the 2000..2038 window.
/// Anything else falls through to date parsing.
fn numeric_string_seconds(s: &str) -> Option<i64> {
    let n: f64 = s.parse().ok()?;
    if !n.is_finite() || n <= 0.0 {
        return None;
    }
    let floor = SANITY_FLOOR_SECONDS as f64;
    let ceiling = MAX_SECONDS as f64;
    if (floor..=ceiling).contains(&n) {
        Some(n.floor() as i64)
    } else if (floor * 1_000.0..=ceiling * 1_000.0).contains(&n) {
        Some((n / 1_000.0).floor() as i64)
    } else {
        None
    }
}

fn parse_formatted(s: &str, date_times: &[&str], dates: &[&str]) -> Option<i64> {
    for fmt in date_times {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for fmt in dates {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

fn parse_freeform(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp_millis());
    }
    FREEFORM_NAIVE
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
}
