//! Locale-tolerant value normalization for statement cells
//!
//! Dates come in whatever order the bank prefers and amounts mix Brazilian,
//! European and US conventions, currency symbols and DR/CR markers. Everything
//! here is pure and returns a [`RowError`] on input that cannot be read.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::Cell;
use crate::error::RowError;

/// Date patterns in try order. The first that parses wins, so "01/02/2026"
/// is read day-first (1 February 2026).
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DEBIT_MARKERS: &[&str] = &["debito", "debit", "dr"];
const CREDIT_MARKERS: &[&str] = &["credito", "credit", "cr"];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£'];

/// Parse a statement date into a calendar date
pub fn normalize_date(raw: &str) -> Result<NaiveDate, RowError> {
    let value = raw.trim();

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(date);
        }
    }

    // Strict ISO 8601 date-times, keeping only the date part
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(dt.date());
        }
    }

    Err(RowError::InvalidDate(raw.to_string()))
}

/// Parse a date cell. Spreadsheet date cells arrive already as ISO text.
pub fn normalize_date_cell(cell: &Cell) -> Result<NaiveDate, RowError> {
    match cell {
        Cell::Text(s) => normalize_date(s),
        other => Err(RowError::InvalidDate(other.to_string())),
    }
}

/// Trim and collapse runs of whitespace to a single space
pub fn normalize_description(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove diacritics: "Débito" -> "Debito"
pub fn fold_accents(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Convert an amount cell to signed minor units.
///
/// Float cells are rounded half away from zero; integer cells are whole
/// currency units.
pub fn parse_amount_to_cents(cell: &Cell) -> Result<i64, RowError> {
    match cell {
        Cell::Text(s) => parse_amount_text(s),
        Cell::Int(v) => v
            .checked_mul(100)
            .ok_or_else(|| RowError::InvalidAmount(v.to_string())),
        Cell::Float(v) => {
            let cents = (v * 100.0).round();
            if !cents.is_finite() || cents.abs() >= i64::MAX as f64 {
                return Err(RowError::InvalidAmount(v.to_string()));
            }
            Ok(cents as i64)
        }
        other => Err(RowError::InvalidAmount(other.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Debit,
    Credit,
}

/// Parse amount text such as `"R$ 1.234,56"`, `"45,90 DR"`, `"12.34-"` or
/// `"(15.00)"` into signed minor units.
///
/// A DR/CR marker decides the sign over anything parsed from the digits.
pub fn parse_amount_text(raw: &str) -> Result<i64, RowError> {
    let invalid = || RowError::InvalidAmount(raw.to_string());

    let folded = fold_accents(raw).to_lowercase();
    let marker = detect_marker(&folded);

    let cleaned: String = folded
        .chars()
        .filter(|c| !c.is_alphabetic() && !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    let mut body = cleaned.as_str();
    let mut negative = false;

    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = inner;
    }
    if let Some(rest) = body.strip_suffix('-') {
        negative = true;
        body = rest;
    }
    if let Some(rest) = body.strip_prefix('-') {
        negative = true;
        body = rest;
    } else if let Some(rest) = body.strip_prefix('+') {
        body = rest;
    }

    let number = if body.contains('.') && body.contains(',') {
        body.replace('.', "").replace(',', ".")
    } else {
        body.replace(',', ".")
    };

    let magnitude = decimal_to_cents(&number).ok_or_else(invalid)?;

    let cents = match marker {
        Some(Marker::Debit) => -magnitude,
        Some(Marker::Credit) => magnitude,
        None if negative => -magnitude,
        None => magnitude,
    };
    Ok(cents)
}

/// First debit/credit marker among the letter tokens of already folded,
/// lowercased text
fn detect_marker(folded: &str) -> Option<Marker> {
    folded
        .split(|c: char| !c.is_alphabetic())
        .filter(|token| !token.is_empty())
        .find_map(|token| {
            if DEBIT_MARKERS.contains(&token) {
                Some(Marker::Debit)
            } else if CREDIT_MARKERS.contains(&token) {
                Some(Marker::Credit)
            } else {
                None
            }
        })
}

/// Exact `digits[.digits]` to minor units, rounding half away from zero at
/// the third decimal
fn decimal_to_cents(number: &str) -> Option<i64> {
    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };

    let digit = |i: usize| -> i64 {
        frac_part
            .as_bytes()
            .get(i)
            .map(|b| i64::from(b - b'0'))
            .unwrap_or(0)
    };
    let mut fraction = digit(0) * 10 + digit(1);
    if digit(2) >= 5 {
        fraction += 1;
    }

    whole.checked_mul(100)?.checked_add(fraction)
}
