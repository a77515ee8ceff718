// src/utils/date.rs

//! Date recognition in free-form page text.

use chrono::NaiveDate;
use regex::{Captures, Regex};

const MONTHS: &str = "Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?";

/// First valid `DD[./-]MM[./-]YYYY` date in the text.
pub fn parse_dmy(text: &str) -> Option<NaiveDate> {
    let pattern = Regex::new(r"(\d{2})[./-](\d{2})[./-](\d{4})").ok()?;
    first_valid(&pattern, text, |c| ymd(&c[3], &c[2], &c[1]))
}

/// First date found in the text, trying numeric formats before spelled-out months.
///
/// Supports `16-09-2025`, `16/9/2025`, `16.09.2025`, `2025-09-16`,
/// `16 September 2025`, `16 Sep 2025`, `16-Sep-2025` and `Sep 16, 2025`.
pub fn parse_date_from_text(text: &str) -> Option<NaiveDate> {
    let day_first = Regex::new(r"\b(\d{1,2})[./-](\d{1,2})[./-](\d{4})\b").ok()?;
    let year_first = Regex::new(r"\b(\d{4})[./-](\d{2})[./-](\d{2})\b").ok()?;
    let day_month = Regex::new(&format!(r"(?i)\b(\d{{1,2}})[\s-]+({MONTHS})[\s-]+(\d{{4}})\b")).ok()?;
    let month_day = Regex::new(&format!(r"(?i)\b({MONTHS})\s+(\d{{1,2}}),\s*(\d{{4}})\b")).ok()?;

    first_valid(&day_first, text, |c| ymd(&c[3], &c[2], &c[1]))
        .or_else(|| first_valid(&year_first, text, |c| ymd(&c[1], &c[2], &c[3])))
        .or_else(|| {
            first_valid(&day_month, text, |c| {
                month_number(&c[2]).and_then(|m| ymd_num(&c[3], m, &c[1]))
            })
        })
        .or_else(|| {
            first_valid(&month_day, text, |c| {
                month_number(&c[1]).and_then(|m| ymd_num(&c[3], m, &c[2]))
            })
        })
}

fn first_valid<F>(pattern: &Regex, text: &str, build: F) -> Option<NaiveDate>
where
    F: Fn(&Captures<'_>) -> Option<NaiveDate>,
{
    pattern.captures_iter(text).find_map(|caps| build(&caps))
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    ymd_num(year, month.parse().ok()?, day)
}

fn ymd_num(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
