//! Installment markers embedded in statement descriptions

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// An installment marker found in a description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installment {
    /// Description with the marker removed
    pub base: String,
    pub current: u32,
    pub total: u32,
}

fn patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?i)\(?\s*parcela\s+(\d{1,3})\s+de\s+(\d{1,3})\s*\)?")
                .expect("valid regex"),
            Regex::new(r"\(\s*(\d{1,3})\s*/\s*(\d{1,3})\s*\)").expect("valid regex"),
        ]
    })
}

const SEPARATORS: &[char] = &[' ', '-', '/'];

/// Look for "parcela N de M" or "(N/M)" in a description.
///
/// Markers with `total <= 1` or `current` outside `1..=total` are ignored.
pub fn detect_installment(description: &str) -> Option<Installment> {
    for pattern in patterns() {
        let Some(caps) = pattern.captures(description) else {
            continue;
        };

        let current: u32 = caps[1].parse().ok()?;
        let total: u32 = caps[2].parse().ok()?;
        if total <= 1 || current < 1 || current > total {
            return None;
        }

        let span = caps.get(0)?;
        let head = description[..span.start()].trim_end_matches(SEPARATORS);
        let tail = description[span.end()..].trim_start_matches(SEPARATORS);
        let base = match (head.is_empty(), tail.is_empty()) {
            (false, false) => format!("{} {}", head, tail),
            (false, true) => head.to_string(),
            (true, _) => tail.to_string(),
        };

        return Some(Installment {
            base,
            current,
            total,
        });
    }
    None
}

/// Add calendar months, clamping the day to the length of the target month
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.month0() + months;
    let year = date.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ if is_leap_year(year) => 29,
        _ => 28,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Description used for the `index`-th of `total` installments
pub fn installment_description(base: &str, index: u32, total: u32) -> String {
    format!("{} ({}/{})", base, index, total)
}
