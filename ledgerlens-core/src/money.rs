//! Monetary tokens found in statement text.
//!
//! Amounts are fixed-point [`Decimal`] values. Currency symbols and thousands
//! separators are stripped before parsing; a sign, parentheses or a DR/CR
//! suffix is kept as a [`Direction`] hint instead of a signed value.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which side of the account a movement lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "debit")]
    Debit,
    #[serde(rename = "credit")]
    Credit,
}

/// An amount located in a line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyToken {
    /// Absolute value.
    pub value: Decimal,
    /// Leading/trailing minus or parentheses.
    pub negative: bool,
    /// Explicit `DR`/`CR` suffix.
    pub marker: Option<Direction>,
    pub currency: Option<char>,
    /// Byte offsets of the whole token (including sign and suffix).
    pub start: usize,
    pub end: usize,
}

impl MoneyToken {
    /// Direction implied by the token itself, if any.
    ///
    /// A DR/CR suffix wins over the sign.
    pub fn explicit_direction(&self) -> Option<Direction> {
        match (self.marker, self.negative) {
            (Some(dir), _) => Some(dir),
            (None, true) => Some(Direction::Debit),
            (None, false) => None,
        }
    }
}

static MONEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<open>\()?",
        r"(?P<lead>-\s?)?",
        r"(?P<cur>[£$€])?",
        r"(?P<lead2>-)?",
        r"(?P<num>\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})",
        r"(?P<close>\))?",
        r"(?P<trail>-)?",
        r"(?:\s?(?P<mark>CR|DR|Cr|Dr|cr|dr)\b)?",
    ))
    .expect("money regex is valid")
});

/// Parse a bare number like `1,234.56` into a decimal.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '£' | '$' | '€' | ' '))
        .collect();
    Decimal::from_str(&cleaned).ok()
}

/// Find every amount in `line`, left to right.
///
/// Numbers glued to letters or further digits (reference codes, long
/// decimals) are not amounts.
pub fn scan_amounts(line: &str) -> Vec<MoneyToken> {
    let mut out = Vec::new();

    for caps in MONEY_RE.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(num) = caps.name("num") else { continue };

        // A hyphen glued to a word (`ACME-12.00`) separates, it does not negate.
        let glued = |at: usize| {
            line[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '.' || c == ',')
        };
        let hyphen_only = caps.name("lead").is_some() && glued(whole.start());
        if !hyphen_only && glued(whole.start()) {
            continue;
        }
        let after = line[whole.end()..].chars().next();
        if after.is_some_and(|c| c.is_ascii_digit()) {
            continue;
        }

        let Some(value) = parse_decimal(num.as_str()) else { continue };

        let parenthesized = caps.name("open").is_some() && caps.name("close").is_some();
        let negative = parenthesized
            || (caps.name("lead").is_some() && !hyphen_only)
            || caps.name("lead2").is_some()
            || caps.name("trail").is_some();

        let marker = caps.name("mark").map(|m| {
            if m.as_str().eq_ignore_ascii_case("cr") {
                Direction::Credit
            } else {
                Direction::Debit
            }
        });

        // An unmatched parenthesis belongs to the surrounding text.
        let start = match (caps.name("open"), caps.name("lead")) {
            (Some(open), _) if !parenthesized => open.end(),
            (None, Some(lead)) if hyphen_only => lead.end(),
            _ => whole.start(),
        };

        out.push(MoneyToken {
            value,
            negative,
            marker,
            currency: caps.name("cur").and_then(|c| c.as_str().chars().next()),
            start,
            end: whole.end(),
        });
    }

    out
}

/// Parse a table cell that holds exactly one amount and nothing else.
pub fn parse_amount_cell(cell: &str) -> Option<MoneyToken> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut tokens = scan_amounts(trimmed);
    if tokens.len() != 1 {
        return None;
    }
    let token = tokens.remove(0);
    if token.start == 0 && token.end == trimmed.len() {
        Some(token)
    } else {
        None
    }
}
