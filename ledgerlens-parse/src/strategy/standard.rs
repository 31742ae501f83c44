//! Standard statement lines:
//!
//!   2023-06-05 CARD PAYMENT TO TESCO      12.50     987.50
//!
//! A canonical date at the start, a description, then one to three trailing
//! amounts: movement; movement and balance; or debit, credit and balance.
//! A following line with neither date nor amount continues the description.

use rust_decimal::Decimal;

use ledgerlens_core::dates::{find_canonical, starts_with_canonical};
use ledgerlens_core::money::scan_amounts;
use ledgerlens_core::{Direction, MoneyToken, NormalizedText, TransactionCandidate};

use super::{Movement, ParseStrategy, RowBuilder, clean_description};
use crate::classify::{balance_value, is_balance_marker};

pub struct StandardStrategy {
    tolerance: Decimal,
}

impl StandardStrategy {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }
}

struct Row<'a> {
    date: chrono::NaiveDate,
    description: &'a str,
    amounts: Vec<MoneyToken>,
}

/// Date, description and the trailing run of amounts.
fn parse_row(text: &str) -> Option<Row<'_>> {
    let (date, end) = starts_with_canonical(text)?;
    let rest = &text[end..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }

    let tokens = scan_amounts(rest);
    let last = tokens.last()?;
    if !rest[last.end..].trim().is_empty() {
        return None;
    }
    let mut first = tokens.len() - 1;
    while first > 0 && rest[tokens[first - 1].end..tokens[first].start].trim().is_empty() {
        first -= 1;
    }
    let amounts: Vec<MoneyToken> = tokens[first..].to_vec();
    if amounts.len() > 3 {
        return None;
    }

    let description = rest[..amounts[0].start].trim();
    if !description.chars().any(char::is_alphabetic) {
        return None;
    }
    Some(Row {
        date,
        description,
        amounts,
    })
}

impl ParseStrategy for StandardStrategy {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn parse(&self, text: &NormalizedText) -> Vec<TransactionCandidate> {
        let mut rows = RowBuilder::new(self.tolerance, Direction::Debit, 1.0);
        // Page of the candidate that may still take a continuation line
        let mut open: Option<usize> = None;

        for line in text.lines() {
            if let Some(row) = parse_row(line.text) {
                let a = &row.amounts;
                if is_balance_marker(row.description) {
                    let balance = a.last().map(balance_value);
                    rows.push(text, &line, row.date, row.description, Movement::None, balance);
                    open = None;
                    continue;
                }
                match a.len() {
                    1 => rows.push(text, &line, row.date, row.description, Movement::Token(&a[0]), None),
                    2 => {
                        let balance = Some(balance_value(&a[1]));
                        rows.push(text, &line, row.date, row.description, Movement::Token(&a[0]), balance)
                    }
                    _ => {
                        let movement = Movement::Columns(Some(a[0].value), Some(a[1].value));
                        let balance = Some(balance_value(&a[2]));
                        rows.push(text, &line, row.date, row.description, movement, balance)
                    }
                }
                open = Some(line.page);
                continue;
            }

            let continues = open == Some(line.page)
                && find_canonical(line.text).is_none()
                && scan_amounts(line.text).is_empty()
                && !is_balance_marker(line.text);
            if continues {
                if let Some(last) = rows.last_mut() {
                    last.extend_description(&clean_description(line.text), line.number);
                }
            }
            open = None;
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
        StandardStrategy::new(d("0.005")).parse(&NormalizedText::from_plain(text))
    }

    #[test]
    fn test_movement_and_balance() {
        let c = parse(
            "2023-06-01 Opening balance 1,000.00\n\
             2023-06-05 CARD PAYMENT TESCO 12.50 987.50\n\
             2023-06-06 SALARY ACME 500.00 1,487.50",
        );
        assert_eq!(c.len(), 3);
        assert_eq!(c[0].movement(), None);
        assert_eq!(c[0].balance, Some(d("1000.00")));
        assert_eq!(c[1].debit(), Some(d("12.50")));
        assert_eq!(c[1].description, "CARD PAYMENT TESCO");
        assert_eq!(c[2].credit(), Some(d("500.00")));
        assert_eq!(c[2].balance, Some(d("1487.50")));
    }

    #[test]
    fn test_three_amounts_are_debit_credit_balance() {
        let c = parse("2023-06-05 TRANSFER\t0.00\t250.00\t1,250.00");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].credit(), Some(d("250.00")));
        assert_eq!(c[0].debit(), None);
        assert_eq!(c[0].balance, Some(d("1250.00")));
    }

    #[test]
    fn test_wrapped_description_joins_once() {
        let c = parse(
            "2023-06-05 CARD PAYMENT TO 12.50\n\
             AMAZON MARKETPLACE\n\
             FOOTER TEXT\n\
             2023-06-06 ATM 20.00",
        );
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].description, "CARD PAYMENT TO AMAZON MARKETPLACE");
        assert_eq!((c[0].span.start_line, c[0].span.end_line), (0, 1));
        assert_eq!(c[1].description, "ATM");
    }

    #[test]
    fn test_rejects_non_trailing_or_undated_lines() {
        assert!(parse("TESCO 2023-06-05 12.50").is_empty());
        assert!(parse("2023-06-05 12.50 TESCO").is_empty());
        assert!(parse("2023-06-05 12.50 13.50").is_empty());
        assert!(parse("2023-06-05 A 1.00 2.00 3.00 4.00").is_empty());
    }

    #[test]
    fn test_explicit_markers_and_overdrawn_balance() {
        let c = parse("2023-06-05 DIRECT CREDIT 45.00 CR 10.00 DR");
        assert_eq!(c[0].credit(), Some(d("45.00")));
        assert_eq!(c[0].balance, Some(d("-10.00")));
        assert!(c[0].confidence > 0.9);
    }
}
