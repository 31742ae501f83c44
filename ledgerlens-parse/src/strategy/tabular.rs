//! Tab-separated tables.
//!
//! The normalizer turns wide whitespace gaps into single tabs, so table rows
//! arrive as tab-separated cells. A header row (Date / Description / Paid out
//! / Paid in / Balance ...) fixes the column roles until the next header or
//! page break. Without a header, a page needs at least two dated rows and the
//! most common count of trailing amount cells decides whether the last
//! amount is a balance.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;

use ledgerlens_core::dates::starts_with_canonical;
use ledgerlens_core::money::parse_amount_cell;
use ledgerlens_core::{Direction, MoneyToken, NormalizedText, TextLine, TransactionCandidate};

use super::{Movement, ParseStrategy, RowBuilder};
use crate::classify::{balance_value, is_balance_marker};

pub struct TabularStrategy {
    tolerance: Decimal,
}

impl TabularStrategy {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Date,
    Description,
    Debit,
    Credit,
    Amount,
    Balance,
    Other,
}

static ROLE_RES: Lazy<Vec<(Role, Regex)>> = Lazy::new(|| {
    [
        (Role::Balance, r"\bbalance\b"),
        (Role::Date, r"\bdate\b"),
        (Role::Debit, r"\b(?:debits?|paid out|money out|out|withdrawals?|payments?)\b"),
        (Role::Credit, r"\b(?:credits?|paid in|money in|in|deposits?|receipts?)\b"),
        (Role::Amount, r"\b(?:amount|value)\b"),
        (
            Role::Description,
            r"\b(?:description|details|particulars|narrative|transaction|payee|reference)\b",
        ),
    ]
    .into_iter()
    .map(|(role, pattern)| {
        let re = Regex::new(&format!("(?i){pattern}")).expect("column role regex is valid");
        (role, re)
    })
    .collect()
});

fn cell_role(cell: &str) -> Role {
    ROLE_RES
        .iter()
        .find(|(_, re)| re.is_match(cell))
        .map_or(Role::Other, |(role, _)| *role)
}

/// Column roles if `cells` is a header row.
fn header_roles(cells: &[&str]) -> Option<Vec<Role>> {
    if cells.len() < 3 || cells.iter().any(|c| c.chars().any(|ch| ch.is_ascii_digit())) {
        return None;
    }
    let roles: Vec<Role> = cells.iter().map(|c| cell_role(c)).collect();
    let dates = roles.iter().filter(|r| **r == Role::Date).count();
    let money = roles
        .iter()
        .any(|r| matches!(r, Role::Debit | Role::Credit | Role::Amount | Role::Balance));
    (dates == 1 && money).then_some(roles)
}

fn cells(text: &str) -> Vec<&str> {
    text.split('\t').map(str::trim).collect()
}

/// A dated row split into description text and trailing amount cells.
struct Row {
    date: NaiveDate,
    description: String,
    amounts: Vec<MoneyToken>,
}

fn generic_row(text: &str) -> Option<Row> {
    let cells = cells(text);
    if cells.len() < 2 {
        return None;
    }
    let (date, end) = starts_with_canonical(cells[0])?;

    let mut amounts = Vec::new();
    let mut split = cells.len();
    while split > 1 {
        match parse_amount_cell(cells[split - 1]) {
            Some(token) => amounts.push(token),
            None => break,
        }
        split -= 1;
    }
    if amounts.is_empty() {
        return None;
    }
    amounts.reverse();

    let mut description = cells[0][end..].trim().to_string();
    for cell in &cells[1..split] {
        if !description.is_empty() && !cell.is_empty() {
            description.push(' ');
        }
        description.push_str(cell);
    }
    Some(Row {
        date,
        description,
        amounts,
    })
}

struct Layout {
    has_balance: bool,
}

/// Most common trailing-amount count across a page's dated rows.
fn infer_layout(lines: &[TextLine<'_>]) -> Option<Layout> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    let mut rows = 0;
    for line in lines {
        if let Some(row) = generic_row(line.text) {
            rows += 1;
            *counts.entry(row.amounts.len()).or_default() += 1;
        }
    }
    if rows < 2 {
        return None;
    }
    let modal = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(n, _)| n)?;
    Some(Layout { has_balance: modal >= 2 })
}

/// Map a row by header position; only possible when no cell went missing.
fn push_positional(rows: &mut RowBuilder, text: &NormalizedText, line: &TextLine<'_>, roles: &[Role]) -> bool {
    let cells = cells(line.text);
    if cells.len() != roles.len() {
        return false;
    }
    let mut date = None;
    let mut description = Vec::new();
    let (mut debit, mut credit, mut amount, mut balance) = (None, None, None, None);
    for (cell, role) in cells.iter().zip(roles) {
        match role {
            Role::Date => date = starts_with_canonical(cell).map(|(d, _)| d),
            Role::Description | Role::Other => description.push(*cell),
            Role::Debit => debit = parse_amount_cell(cell).map(|t| t.value),
            Role::Credit => credit = parse_amount_cell(cell).map(|t| t.value),
            Role::Amount => amount = parse_amount_cell(cell),
            Role::Balance => balance = parse_amount_cell(cell).map(|t| balance_value(&t)),
        }
    }
    let Some(date) = date else { return false };
    let description = description.join(" ");

    let movement = match (&amount, debit, credit) {
        (Some(token), _, _) => Movement::Token(token),
        (None, None, None) if balance.is_some() => Movement::None,
        (None, None, None) => return false,
        (None, d, c) => Movement::Columns(d, c),
    };
    rows.push(text, line, date, &description, movement, balance);
    true
}

fn push_generic(rows: &mut RowBuilder, text: &NormalizedText, line: &TextLine<'_>, has_balance: bool) {
    let Some(row) = generic_row(line.text) else { return };
    let a = &row.amounts;
    if is_balance_marker(&row.description) {
        let balance = a.last().map(balance_value);
        rows.push(text, line, row.date, &row.description, Movement::None, balance);
        return;
    }
    let (movement, balance) = match (a.len(), has_balance) {
        (1, _) => (Movement::Token(&a[0]), None),
        (2, true) => (Movement::Token(&a[0]), Some(balance_value(&a[1]))),
        (2, false) => (Movement::Columns(Some(a[0].value), Some(a[1].value)), None),
        (3, true) => (
            Movement::Columns(Some(a[0].value), Some(a[1].value)),
            Some(balance_value(&a[2])),
        ),
        _ => return,
    };
    rows.push(text, line, row.date, &row.description, movement, balance);
}

impl ParseStrategy for TabularStrategy {
    fn name(&self) -> &'static str {
        "tabular"
    }

    fn parse(&self, text: &NormalizedText) -> Vec<TransactionCandidate> {
        let mut rows = RowBuilder::new(self.tolerance, Direction::Debit, 1.0);
        let lines = text.lines();

        for page_lines in lines.chunk_by(|a, b| a.page == b.page) {
            let inferred = infer_layout(page_lines);
            let mut header: Option<Vec<Role>> = None;
            rows.forget_balance();

            for line in page_lines {
                if !line.text.contains('\t') {
                    continue;
                }
                if let Some(roles) = header_roles(&cells(line.text)) {
                    tracing::debug!(page = line.page, line = line.number, "table header");
                    header = Some(roles);
                    rows.forget_balance();
                    continue;
                }
                match (&header, &inferred) {
                    (Some(roles), _) => {
                        if !push_positional(&mut rows, text, line, roles) {
                            push_generic(&mut rows, text, line, roles.contains(&Role::Balance));
                        }
                    }
                    (None, Some(layout)) => push_generic(&mut rows, text, line, layout.has_balance),
                    (None, None) => {}
                }
            }
        }

        rows.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlens_core::page_marker;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn parse(text: &str) -> Vec<TransactionCandidate> {
        TabularStrategy::new(d("0.005")).parse(&NormalizedText::from_plain(text))
    }

    #[test]
    fn test_header_roles() {
        let roles = header_roles(&["Date", "Description", "Paid out", "Paid in", "Balance"]).unwrap();
        assert_eq!(
            roles,
            [Role::Date, Role::Description, Role::Debit, Role::Credit, Role::Balance]
        );
        assert!(header_roles(&["2023-06-05", "TESCO", "12.50"]).is_none());
        assert!(header_roles(&["Name", "Address", "City"]).is_none());
    }

    #[test]
    fn test_positional_mapping_with_header() {
        let c = parse(
            "Date\tDescription\tPaid out\tPaid in\tBalance\n\
             2023-06-05\tTESCO\t12.50\t0.00\t987.50\n\
             2023-06-06\tREFUND\t0.00\t2.50\t990.00",
        );
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].debit(), Some(d("12.50")));
        assert_eq!(c[1].credit(), Some(d("2.50")));
        assert_eq!(c[1].balance, Some(d("990.00")));
    }

    #[test]
    fn test_collapsed_empty_column_falls_back_to_balance_delta() {
        let c = parse(
            "Date\tDescription\tPaid out\tPaid in\tBalance\n\
             2023-06-05\tOpening balance\t1,000.00\n\
             2023-06-05\tACME LTD\t12.50\t987.50\n\
             2023-06-06\tACME LTD\t2.50\t990.00",
        );
        assert_eq!(c.len(), 3);
        assert_eq!(c[0].movement(), None);
        assert_eq!(c[1].debit(), Some(d("12.50")));
        assert_eq!(c[2].credit(), Some(d("2.50")));
    }

    #[test]
    fn test_inferred_layout_needs_two_rows() {
        assert!(parse("2023-06-05\tTESCO\t12.50\t987.50").is_empty());
        let c = parse("2023-06-05\tTESCO\t12.50\t987.50\n2023-06-06\tTESCO\t2.50\t985.00");
        assert_eq!(c.len(), 2);
        assert_eq!(c[1].balance, Some(d("985.00")));
        assert_eq!(c[1].debit(), Some(d("2.50")));
    }

    #[test]
    fn test_lines_without_columns_are_ignored() {
        assert!(parse("2023-06-05 TESCO 12.50 987.50\n2023-06-06 TESCO 2.50 985.00").is_empty());
    }

    #[test]
    fn test_header_redetected_per_page() {
        let text = format!(
            "{}\nDate\tDetails\tAmount\tBalance\n2023-06-05\tTESCO\t12.50-\t987.50\n{}\n2023-06-06\tX\t1.00\n",
            page_marker(0),
            page_marker(1)
        );
        let nt = NormalizedText::new(text, vec![1.0, 0.5]);
        let c = TabularStrategy::new(d("0.005")).parse(&nt);
        // Page 2 has no header and only one dated row.
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].debit(), Some(d("12.50")));
    }
}
