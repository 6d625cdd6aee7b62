//! # Field Extractors
//!
//! Pure functions that turn a node of a parsed albumoftheyear.org page into a
//! validated value. None of them perform I/O or log; every failure is a typed
//! [`ExtractionError`] that the [assembler](crate::assembler) decides what to
//! do with.
//!
//! ## Conventions
//!
//! - Repeated elements are always returned in document order.
//! - Optional fields that are absent yield `None` or an empty collection.
//! - Counts accept thousand separators (`1,234`, `1.234`, `1 234`).
//! - Ratings must lie in `0..=100`; anything else is a
//!   [`ExtractionError::MalformedValue`], never clamped.

pub mod album;
pub mod user;

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

use crate::error::ExtractionError;

/// Compiles one of the crate's constant selectors.
///
/// Only called from `LazyLock` initializers with literal CSS, so a parse
/// failure is a programming error caught by the unit tests.
pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}

static LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}:\d{2}(:\d{2})?$").unwrap_or_else(|e| panic!("{e}")));

/// Collapses whitespace runs (including NBSP) and trims.
pub(crate) fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated text of an element, cleaned.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Text of the first descendant matching `sel`, `None` if absent or blank.
pub(crate) fn select_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope
        .select(sel)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Like [`select_text`] but the field is required.
pub(crate) fn require_text(
    scope: ElementRef<'_>,
    sel: &Selector,
    field: &'static str,
) -> Result<String, ExtractionError> {
    select_text(scope, sel).ok_or(ExtractionError::MissingRequiredField(field))
}

/// Attribute of the first descendant matching `sel`, trimmed, `None` if blank.
pub(crate) fn select_attr(scope: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    scope
        .select(sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Parses a non-negative count, tolerating locale thousand separators.
pub fn parse_count(field: &'static str, raw: &str) -> Result<u64, ExtractionError> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | '\'' | '\u{a0}' | '\u{202f}') && !c.is_whitespace())
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ExtractionError::MalformedValue(field, raw.to_string()));
    }

    digits
        .parse()
        .map_err(|_| ExtractionError::MalformedValue(field, raw.to_string()))
}

/// Parses an integer rating in `0..=100`.
pub fn parse_rating(field: &'static str, raw: &str) -> Result<u8, ExtractionError> {
    let trimmed = raw.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| ExtractionError::MalformedValue(field, raw.to_string()))?;

    if (0..=100).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ExtractionError::MalformedValue(field, raw.to_string()))
    }
}

/// Like [`parse_rating`] but "NR" (not rated) and blanks mean absent.
pub fn parse_optional_rating(field: &'static str, raw: &str) -> Result<Option<u8>, ExtractionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nr") {
        return Ok(None);
    }
    parse_rating(field, trimmed).map(Some)
}

/// Parses a fractional score in `0.0..=100.0`.
pub fn parse_score(field: &'static str, raw: &str) -> Result<f64, ExtractionError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ExtractionError::MalformedValue(field, raw.to_string()))?;

    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(ExtractionError::MalformedValue(field, raw.to_string()))
    }
}

/// Track length as printed (`4:23`, `1:02:11`), `None` when unrecognisable.
pub fn parse_length(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    LENGTH_RE.is_match(trimmed).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_count_separators() {
        assert_eq!(parse_count("n", "13"), Ok(13));
        assert_eq!(parse_count("n", "1,234"), Ok(1234));
        assert_eq!(parse_count("n", "1.234.567"), Ok(1_234_567));
        assert_eq!(parse_count("n", " 12\u{a0}345 "), Ok(12345));
        assert_eq!(parse_count("n", "2'500"), Ok(2500));
    }

    #[test]
    fn test_parse_count_rejects_garbage() {
        assert!(matches!(
            parse_count("n", "-3"),
            Err(ExtractionError::MalformedValue("n", _))
        ));
        assert!(parse_count("n", "").is_err());
        assert!(parse_count("n", "12k").is_err());
    }

    #[test]
    fn test_parse_rating_bounds() {
        assert_eq!(parse_rating("rating", "0"), Ok(0));
        assert_eq!(parse_rating("rating", " 100 "), Ok(100));
        assert_eq!(
            parse_rating("rating", "101"),
            Err(ExtractionError::MalformedValue("rating", "101".into()))
        );
        assert!(parse_rating("rating", "-1").is_err());
        assert!(parse_rating("rating", "eighty").is_err());
    }

    #[test]
    fn test_parse_optional_rating() {
        assert_eq!(parse_optional_rating("rating", "NR"), Ok(None));
        assert_eq!(parse_optional_rating("rating", ""), Ok(None));
        assert_eq!(parse_optional_rating("rating", "85"), Ok(Some(85)));
        assert!(parse_optional_rating("rating", "250").is_err());
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("score", "87.4"), Ok(87.4));
        assert!(parse_score("score", "100.1").is_err());
        assert!(parse_score("score", "NaN").is_err());
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length(" 4:23 "), Some("4:23".to_string()));
        assert_eq!(parse_length("1:02:11"), Some("1:02:11".to_string()));
        assert_eq!(parse_length("4m23s"), None);
        assert_eq!(parse_length(""), None);
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  OK\n   Computer\u{a0} "), "OK Computer");
    }
}
