//! Parsed transaction candidates and the parse result handed to callers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diagnostics::Diagnostics;
use crate::money::Direction;

/// Where a candidate came from in the normalized text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSpan {
    pub page: usize,
    /// First and last normalized-text line (inclusive, 0-based).
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceSpan {
    pub fn line(page: usize, line: usize) -> Self {
        Self {
            page,
            start_line: line,
            end_line: line,
        }
    }
}

/// A provisional transaction.
///
/// At most one of debit/credit is ever set; the constructor takes a single
/// optional movement so the invariant cannot be broken.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransactionCandidate {
    pub date: NaiveDate,
    pub description: String,
    debit: Option<Decimal>,
    credit: Option<Decimal>,
    pub balance: Option<Decimal>,
    pub span: SourceSpan,
    pub confidence: f32,
}

impl TransactionCandidate {
    /// `movement` is the absolute amount and its side of the account.
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        movement: Option<(Direction, Decimal)>,
        balance: Option<Decimal>,
        span: SourceSpan,
        confidence: f32,
    ) -> Self {
        let (debit, credit) = match movement {
            Some((Direction::Debit, amount)) => (Some(amount.abs()), None),
            Some((Direction::Credit, amount)) => (None, Some(amount.abs())),
            None => (None, None),
        };
        Self {
            date,
            description: description.into(),
            debit,
            credit,
            balance,
            span,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn debit(&self) -> Option<Decimal> {
        self.debit
    }

    pub fn credit(&self) -> Option<Decimal> {
        self.credit
    }

    pub fn movement(&self) -> Option<(Direction, Decimal)> {
        match (self.debit, self.credit) {
            (Some(d), _) => Some((Direction::Debit, d)),
            (None, Some(c)) => Some((Direction::Credit, c)),
            (None, None) => None,
        }
    }

    /// credit - debit; zero for balance-only rows.
    pub fn net(&self) -> Decimal {
        self.credit.unwrap_or_default() - self.debit.unwrap_or_default()
    }

    /// Append a wrapped description line.
    pub fn extend_description(&mut self, more: &str, line: usize) {
        let more = more.trim();
        if more.is_empty() {
            return;
        }
        if !self.description.is_empty() {
            self.description.push(' ');
        }
        self.description.push_str(more);
        self.span.end_line = self.span.end_line.max(line);
    }
}

/// A consecutive pair whose balances do not add up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationWarning {
    /// Index of the later candidate in `ParseResult::transactions`
    pub candidate_index: usize,
    pub previous_index: usize,
    pub line: usize,
    pub expected: Decimal,
    pub actual: Decimal,
    pub difference: Decimal,
}

/// How one strategy fared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyAttempt {
    pub name: String,
    pub candidates: usize,
    /// Consecutive pairs with both balances present
    pub checked_pairs: usize,
    pub reconciled_pairs: usize,
    pub accepted: bool,
}

impl StrategyAttempt {
    /// Fraction of checked pairs that reconcile; 1.0 when nothing could be checked.
    pub fn pass_rate(&self) -> f64 {
        if self.checked_pairs == 0 {
            1.0
        } else {
            self.reconciled_pairs as f64 / self.checked_pairs as f64
        }
    }
}

/// Ordered transactions plus everything needed to explain them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParseResult {
    /// Document order; never re-sorted by date
    pub transactions: Vec<TransactionCandidate>,
    pub strategy_used: String,
    /// Candidate count per attempted strategy, zero entries included
    pub strategy_counts: BTreeMap<String, usize>,
    pub attempts: Vec<StrategyAttempt>,
    pub reconciliation_warnings: Vec<ReconciliationWarning>,
    /// Winner was picked without clearing the reconciliation threshold
    pub low_confidence: bool,
    pub diagnostics: Diagnostics,
}
