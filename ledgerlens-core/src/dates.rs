//! Statement date tokens.
//!
//! Statements print dates in many shapes (`05/06/2023`, `05 Jun 2023`,
//! `05-06-23`, `05JUN23`). The normalizer rewrites all recognised shapes to
//! the canonical `YYYY-MM-DD` token, and parsing strategies only ever look
//! for that canonical form.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Canonical date format written by [`rewrite_dates`].
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

static CANONICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("canonical date regex is valid"));

// DD/MM/YYYY, DD-MM-YY, with a US MM/DD fallback when day-first is impossible
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})([/-])(\d{1,2})([/-])(\d{4}|\d{2})\b").expect("numeric date regex is valid")
});

static ISO_SLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})/(\d{1,2})/(\d{1,2})\b").expect("iso date regex is valid"));

// DD MMM YYYY, DD-MMM-YY, DDMMMYYYY, 5th June 2023
static MONTH_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[ \-]?",
        r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?",
        r"|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)",
        r"\.?[ \-]?(\d{4}|\d{2})\b",
    ))
    .expect("month-name date regex is valid")
});

/// Expand a two-digit year: `< 50` lands in the 2000s, the rest in the 1900s.
pub fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    match raw.len() {
        2 if year < 50 => Some(2000 + year),
        2 => Some(1900 + year),
        4 => Some(year),
        _ => None,
    }
}

/// Month number from an English month name or abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let month = match lower.get(..3)? {
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

/// Parse a canonical `YYYY-MM-DD` token.
pub fn parse_canonical(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token.trim(), CANONICAL_FORMAT).ok()
}

/// First canonical date in `line` with its byte span.
pub fn find_canonical(line: &str) -> Option<(NaiveDate, usize, usize)> {
    CANONICAL_RE.captures_iter(line).find_map(|caps| {
        let whole = caps.get(0)?;
        let date = parse_canonical(whole.as_str())?;
        Some((date, whole.start(), whole.end()))
    })
}

/// True when `line` starts with a canonical date token.
pub fn starts_with_canonical(line: &str) -> Option<(NaiveDate, usize)> {
    let (date, start, end) = find_canonical(line)?;
    if start == 0 { Some((date, end)) } else { None }
}

fn numeric_date(caps: &Captures) -> Option<NaiveDate> {
    if caps[2] != caps[4] {
        return None;
    }
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[3].parse().ok()?;
    let year = expand_year(&caps[5])?;
    NaiveDate::from_ymd_opt(year, second, first).or_else(|| NaiveDate::from_ymd_opt(year, first, second))
}

fn iso_slash_date(caps: &Captures) -> Option<NaiveDate> {
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_name_date(caps: &Captures) -> Option<NaiveDate> {
    let day: u32 = caps[1].parse().ok()?;
    let month = month_from_name(&caps[2])?;
    let year = expand_year(&caps[3])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Replace every match of `re` for which `convert` yields a date.
///
/// A match directly followed by a decimal fraction (`10 Jun 12.50`) is an
/// amount, not a year, and is left alone.
fn rewrite_with(re: &Regex, text: &str, convert: fn(&Captures) -> Option<NaiveDate>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let mut rest = text[whole.end()..].chars();
        if matches!(rest.next(), Some('.') | Some(',')) && rest.next().is_some_and(|c| c.is_ascii_digit()) {
            continue;
        }
        if let Some(date) = convert(&caps) {
            out.push_str(&text[last..whole.start()]);
            out.push_str(&date.format(CANONICAL_FORMAT).to_string());
            last = whole.end();
        }
    }

    out.push_str(&text[last..]);
    out
}

/// Rewrite recognised date tokens in place to `YYYY-MM-DD`.
///
/// Unrecognised or impossible dates are left untouched, as is the text
/// around every token. Applying this twice is the same as applying it once.
pub fn rewrite_dates(text: &str) -> String {
    let text = rewrite_with(&ISO_SLASH_RE, text, iso_slash_date);
    let text = rewrite_with(&NUMERIC_RE, &text, numeric_date);
    rewrite_with(&MONTH_NAME_RE, &text, month_name_date)
}
