//! Lenient year extraction from free-form LLM date strings.
//!
//! The model returns dates however the biography phrases them:
//! `"March 23, 1882"`, `"1882-03-23"`, `"23 March 1882"`, `"c. 1882"`,
//! `"1930s"`. Only the year is kept in the tables.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([12][0-9]{3})\b").unwrap());

/// Full-date formats tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %b %Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
];

/// Year of a date-ish JSON value.
///
/// Missing, non-string, empty and unparseable values all give `None`.
pub fn year_or_none(value: Option<&Value>) -> Option<i32> {
    match value {
        Some(Value::String(s)) => parse_year(s),
        _ => None,
    }
}

/// Year of a free-form date string.
pub fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(chrono::Datelike::year(&date));
        }
    }

    // Partial dates (`1882-03`, `March 1882`, `1882`) and anything with a
    // year buried in prose.
    RE_YEAR
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
