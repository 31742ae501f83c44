//! Parsing strategies: independent `text -> candidates` functions tried in a
//! fixed order by the engine.

mod line;
mod standard;
mod tabular;

pub use line::LineStrategy;
pub use standard::StandardStrategy;
pub use tabular::TabularStrategy;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use ledgerlens_core::{Direction, MoneyToken, NormalizedText, ParsingConfig, SourceSpan, TextLine, TransactionCandidate};

use crate::classify::{self, Basis, Context};

pub trait ParseStrategy: Send + Sync {
    /// Stable name used in results and diagnostics.
    fn name(&self) -> &'static str;

    /// Candidates in document order. Must not fail; an unparseable text
    /// simply yields nothing.
    fn parse(&self, text: &NormalizedText) -> Vec<TransactionCandidate>;
}

/// standard, tabular, line: most to least structured.
pub fn default_chain(cfg: &ParsingConfig) -> Vec<Box<dyn ParseStrategy>> {
    vec![
        Box::new(StandardStrategy::new(cfg.balance_tolerance)),
        Box::new(TabularStrategy::new(cfg.balance_tolerance)),
        Box::new(LineStrategy::new(cfg.balance_tolerance)),
    ]
}

/// The movement found on a row.
pub(crate) enum Movement<'a> {
    None,
    /// One amount whose side must be resolved.
    Token(&'a MoneyToken),
    /// Separate debit and credit column values.
    Columns(Option<Decimal>, Option<Decimal>),
}

/// Turns rows into candidates while tracking the running balance.
pub(crate) struct RowBuilder {
    tolerance: Decimal,
    default: Direction,
    weight: f32,
    last_balance: Option<Decimal>,
    pub(crate) candidates: Vec<TransactionCandidate>,
}

impl RowBuilder {
    pub(crate) fn new(tolerance: Decimal, default: Direction, weight: f32) -> Self {
        Self {
            tolerance,
            default,
            weight,
            last_balance: None,
            candidates: Vec::new(),
        }
    }

    pub(crate) fn push(
        &mut self,
        text: &NormalizedText,
        line: &TextLine<'_>,
        date: NaiveDate,
        description: &str,
        movement: Movement<'_>,
        balance: Option<Decimal>,
    ) {
        let (resolved, basis) = match movement {
            Movement::None => (None, Basis::Explicit),
            Movement::Token(token) => {
                let ctx = Context {
                    description,
                    previous_balance: self.last_balance,
                    balance,
                    tolerance: self.tolerance,
                    default: self.default,
                };
                let (direction, basis) = classify::resolve(token, &ctx);
                (Some((direction, token.value)), basis)
            }
            Movement::Columns(debit, credit) => (classify::split_columns(debit, credit), Basis::Explicit),
        };

        let confidence = basis.confidence() * self.weight * text.page_confidence(line.page);
        self.candidates.push(TransactionCandidate::new(
            date,
            clean_description(description),
            resolved,
            balance,
            SourceSpan::line(line.page, line.number),
            confidence,
        ));
        if balance.is_some() {
            self.last_balance = balance;
        }
    }

    /// Reset the running balance, e.g. when a new table starts.
    pub(crate) fn forget_balance(&mut self) {
        self.last_balance = None;
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut TransactionCandidate> {
        self.candidates.last_mut()
    }

    pub(crate) fn finish(self) -> Vec<TransactionCandidate> {
        self.candidates
    }
}

/// Single-spaced description with separator debris trimmed.
pub(crate) fn clean_description(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, '-' | '|' | ':' | ',' | ';'))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_description() {
        assert_eq!(clean_description("\tCARD PAYMENT\tTO  TESCO - "), "CARD PAYMENT TO TESCO");
        assert_eq!(clean_description(""), "");
    }

    #[test]
    fn test_chain_order() {
        let names: Vec<_> = default_chain(&ParsingConfig::default()).iter().map(|s| s.name()).collect();
        assert_eq!(names, ["standard", "tabular", "line"]);
    }
}
