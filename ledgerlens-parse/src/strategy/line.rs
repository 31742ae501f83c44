//! Last-resort line scan: any line holding a canonical date and an amount.
//!
//! Layout is ignored. The description is whatever sits between the date and
//! the first amount, or before the date when that is empty.

use rust_decimal::Decimal;

use ledgerlens_core::dates::find_canonical;
use ledgerlens_core::money::scan_amounts;
use ledgerlens_core::{Direction, MoneyToken, NormalizedText, TransactionCandidate};

use super::{Movement, ParseStrategy, RowBuilder};
use crate::classify::{balance_value, is_balance_marker};

/// Candidates from this scan are worth less than structured matches.
const WEIGHT: f32 = 0.8;

pub struct LineStrategy {
    tolerance: Decimal,
}

impl LineStrategy {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }
}

/// First one to three amounts, preferring those after the date.
fn pick_amounts(text: &str, date_start: usize, date_end: usize) -> (Vec<MoneyToken>, usize) {
    let after: Vec<MoneyToken> = scan_amounts(&text[date_end..])
        .into_iter()
        .map(|mut t| {
            t.start += date_end;
            t.end += date_end;
            t
        })
        .collect();
    let mut tokens = if after.is_empty() {
        scan_amounts(&text[..date_start])
    } else {
        after
    };
    tokens.truncate(3);
    let first = tokens.first().map_or(text.len(), |t| t.start);
    (tokens, first)
}

impl ParseStrategy for LineStrategy {
    fn name(&self) -> &'static str {
        "line"
    }

    fn parse(&self, text: &NormalizedText) -> Vec<TransactionCandidate> {
        let mut rows = RowBuilder::new(self.tolerance, Direction::Credit, WEIGHT);

        for line in text.lines() {
            let Some((date, start, end)) = find_canonical(line.text) else { continue };
            let (amounts, first) = pick_amounts(line.text, start, end);
            if amounts.is_empty() {
                continue;
            }

            let between = if first > end { line.text[end..first].trim() } else { "" };
            let description = if between.is_empty() {
                line.text[..start.min(first)].trim()
            } else {
                between
            };

            let a = &amounts;
            if is_balance_marker(line.text) {
                let balance = a.last().map(balance_value);
                rows.push(text, &line, date, description, Movement::None, balance);
                continue;
            }
            match a.len() {
                1 => rows.push(text, &line, date, description, Movement::Token(&a[0]), None),
                2 => {
                    let balance = Some(balance_value(&a[1]));
                    rows.push(text, &line, date, description, Movement::Token(&a[0]), balance)
                }
                _ => {
                    let movement = Movement::Columns(Some(a[0].value), Some(a[1].value));
                    let balance = Some(balance_value(&a[2]));
                    rows.push(text, &line, date, description, movement, balance)
                }
            }
        }

        rows.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn parse(text: &str) -> Vec<TransactionCandidate> {
        LineStrategy::new(d("0.005")).parse(&NormalizedText::from_plain(text))
    }

    #[test]
    fn test_date_anywhere() {
        let c = parse("Ref 991 posted 2023-06-05 ACME LTD 45.00 trailing words");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].description, "ACME LTD");
        // No balance or keyword: credit by default.
        assert_eq!(c[0].credit(), Some(d("45.00")));
        assert!((c[0].confidence - 0.6 * WEIGHT).abs() < 1e-6);
    }

    #[test]
    fn test_description_before_date() {
        let c = parse("CARD PAYMENT 2023-06-05 12.50");
        assert_eq!(c[0].description, "CARD PAYMENT");
        assert_eq!(c[0].debit(), Some(d("12.50")));
    }

    #[test]
    fn test_amount_before_date_when_none_after() {
        let c = parse("TESCO 12.50 2023-06-05");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].description, "TESCO");
        assert_eq!(c[0].movement(), Some((Direction::Credit, d("12.50"))));
    }

    #[test]
    fn test_balance_tracking() {
        let c = parse(
            "2023-06-01 Balance brought forward 100.00\n\
             x 2023-06-02 ACME 10.00 90.00\n\
             2023-06-03 ACME 0.00 5.00 95.00 extra 1.00",
        );
        assert_eq!(c.len(), 3);
        assert_eq!(c[0].balance, Some(d("100.00")));
        assert_eq!(c[1].debit(), Some(d("10.00")));
        // Amounts past the third are ignored.
        assert_eq!(c[2].credit(), Some(d("5.00")));
        assert_eq!(c[2].balance, Some(d("95.00")));
    }

    #[test]
    fn test_skips_undated_or_amountless_lines() {
        assert!(parse("ACME 10.00 90.00\n2023-06-05 nothing here").is_empty());
    }
}
