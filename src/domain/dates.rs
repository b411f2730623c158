//! Date-expression normalization.
//!
//! Translates relative expressions ("today", "tomorrow", "3 days") and a fixed
//! set of absolute formats into canonical `YYYY-MM-DD`. Unrecognized input is
//! returned unchanged — the caller decides whether to pass it through.

use chrono::{Duration, NaiveDate};

/// Absolute formats tried in priority order; first match wins. Month-first
/// formats come before day-first, so locale-ambiguous inputs like `02/03/2024`
/// parse month-first unless that is numerically invalid (month > 12).
const ABSOLUTE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m-%d-%y",
];

const CANONICAL: &str = "%Y-%m-%d";

/// Normalize a date expression against the given current date.
///
/// Never fails: anything unrecognized comes back as-is.
pub fn normalize(expression: &str, today: NaiveDate) -> String {
    let trimmed = expression.trim();
    let lower = trimmed.to_lowercase();

    match lower.as_str() {
        "today" | "now" => return today.format(CANONICAL).to_string(),
        "tomorrow" => return (today + Duration::days(1)).format(CANONICAL).to_string(),
        _ => {}
    }

    // "<N> days" with an integer prefix; a non-integer prefix falls through to
    // the absolute formats, as does an offset that overflows the calendar.
    if let Some(prefix) = lower.strip_suffix("days") {
        if let Ok(n) = prefix.trim().parse::<i64>() {
            if let Some(date) =
                Duration::try_days(n).and_then(|delta| today.checked_add_signed(delta))
            {
                return date.format(CANONICAL).to_string();
            }
        }
    }

    for format in ABSOLUTE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.format(CANONICAL).to_string();
        }
    }

    expression.to_string()
}
