//! Strategy selection.
//!
//! Every strategy in the chain is tried in order until one is accepted:
//! enough candidates and a reconciliation pass rate at or above the
//! configured minimum. Without an accepted strategy the largest candidate
//! set wins (earlier strategy on ties) and the result is flagged
//! `low_confidence`. No candidates at all is `NoTransactionsParsed`.

use std::collections::BTreeMap;

use ledgerlens_core::{
    ConversionError, Diagnostics, FailureReport, NormalizedText, ParseResult, ParsingConfig, Result, Stage,
    StrategyAttempt, TransactionCandidate,
};

use crate::reconcile::{Reconciliation, reconcile};
use crate::strategy::{ParseStrategy, default_chain};

struct Outcome {
    attempt: StrategyAttempt,
    candidates: Vec<TransactionCandidate>,
    reconciliation: Reconciliation,
}

pub struct ParsingEngine {
    cfg: ParsingConfig,
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl ParsingEngine {
    /// Engine over the default standard / tabular / line chain.
    pub fn new(cfg: ParsingConfig) -> Self {
        let strategies = default_chain(&cfg);
        Self { cfg, strategies }
    }

    pub fn with_strategies(cfg: ParsingConfig, strategies: Vec<Box<dyn ParseStrategy>>) -> Self {
        Self { cfg, strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn parse(&self, text: &NormalizedText) -> Result<ParseResult> {
        self.parse_with(text, Diagnostics::new())
    }

    /// Parse, appending to diagnostics collected by earlier stages.
    pub fn parse_with(&self, text: &NormalizedText, mut diagnostics: Diagnostics) -> Result<ParseResult> {
        let mut outcomes: Vec<Outcome> = Vec::with_capacity(self.strategies.len());
        let mut accepted = None;

        for strategy in &self.strategies {
            let candidates = strategy.parse(text);
            let reconciliation = reconcile(&candidates, self.cfg.balance_tolerance);
            let mut attempt = StrategyAttempt {
                name: strategy.name().to_string(),
                candidates: candidates.len(),
                checked_pairs: reconciliation.checked_pairs,
                reconciled_pairs: reconciliation.reconciled_pairs,
                accepted: false,
            };
            attempt.accepted = attempt.candidates >= self.cfg.min_candidates.max(1)
                && attempt.pass_rate() >= self.cfg.min_reconciliation_rate;

            tracing::debug!(
                strategy = strategy.name(),
                candidates = attempt.candidates,
                checked = attempt.checked_pairs,
                reconciled = attempt.reconciled_pairs,
                accepted = attempt.accepted,
                "strategy attempt"
            );
            diagnostics.info(
                Stage::Parsing,
                None,
                format!(
                    "{}: {} candidates, {}/{} balance pairs reconcile",
                    attempt.name, attempt.candidates, attempt.reconciled_pairs, attempt.checked_pairs
                ),
            );

            let done = attempt.accepted;
            outcomes.push(Outcome {
                attempt,
                candidates,
                reconciliation,
            });
            if done {
                accepted = Some(outcomes.len() - 1);
                break;
            }
        }

        let strategy_counts: BTreeMap<String, usize> = outcomes
            .iter()
            .map(|o| (o.attempt.name.clone(), o.attempt.candidates))
            .collect();

        let (chosen, low_confidence) = match accepted {
            Some(i) => (i, false),
            None => match best_effort(&outcomes) {
                Some(i) => (i, true),
                None => {
                    diagnostics.error(Stage::Parsing, None, "no strategy produced a transaction");
                    return Err(ConversionError::NoTransactionsParsed(Box::new(FailureReport {
                        pages: Vec::new(),
                        normalized_text: Some(text.as_str().to_string()),
                        strategy_counts,
                        diagnostics,
                    })));
                }
            },
        };

        let attempts: Vec<StrategyAttempt> = outcomes.iter().map(|o| o.attempt.clone()).collect();
        let Outcome {
            attempt,
            candidates,
            reconciliation,
        } = outcomes.swap_remove(chosen);

        if low_confidence {
            tracing::warn!(strategy = %attempt.name, rate = attempt.pass_rate(), "no strategy reconciled; using best effort");
            diagnostics.warn(
                Stage::Parsing,
                None,
                format!(
                    "{} selected below the reconciliation threshold ({:.0}% of pairs reconcile)",
                    attempt.name,
                    attempt.pass_rate() * 100.0
                ),
            );
        }
        for w in &reconciliation.warnings {
            diagnostics.warn(
                Stage::Reconciliation,
                candidates.get(w.candidate_index).map(|c| c.span.page),
                format!(
                    "line {}: balance {} expected {} (off by {})",
                    w.line + 1,
                    w.actual,
                    w.expected,
                    w.difference
                ),
            );
        }

        Ok(ParseResult {
            transactions: candidates,
            strategy_used: attempt.name,
            strategy_counts,
            attempts,
            reconciliation_warnings: reconciliation.warnings,
            low_confidence,
            diagnostics,
        })
    }
}

/// Largest non-empty candidate set; the earlier strategy wins ties.
fn best_effort(outcomes: &[Outcome]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, o) in outcomes.iter().enumerate() {
        if o.attempt.candidates == 0 {
            continue;
        }
        if best.is_none_or(|b| o.attempt.candidates > outcomes[b].attempt.candidates) {
            best = Some(i);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ledgerlens_core::{Direction, SourceSpan};
    use rust_decimal::Decimal;

    /// Emits a fixed list of (movement, balance) rows.
    struct Fixed {
        name: &'static str,
        rows: Vec<(Decimal, Option<Decimal>)>,
    }

    impl ParseStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn parse(&self, _text: &NormalizedText) -> Vec<TransactionCandidate> {
            let date = NaiveDate::from_ymd_opt(2023, 6, 5).unwrap();
            self.rows
                .iter()
                .enumerate()
                .map(|(i, (amount, balance))| {
                    TransactionCandidate::new(
                        date,
                        "x",
                        Some((Direction::Credit, *amount)),
                        *balance,
                        SourceSpan::line(0, i),
                        1.0,
                    )
                })
                .collect()
        }
    }

    fn fixed(name: &'static str, rows: &[(i64, Option<i64>)]) -> Box<dyn ParseStrategy> {
        Box::new(Fixed {
            name,
            rows: rows
                .iter()
                .map(|(a, b)| (Decimal::from(*a), b.map(Decimal::from)))
                .collect(),
        })
    }

    fn text() -> NormalizedText {
        NormalizedText::from_plain("irrelevant")
    }

    #[test]
    fn test_first_accepted_strategy_wins_and_stops_chain() {
        let engine = ParsingEngine::with_strategies(
            ParsingConfig::default(),
            vec![
                fixed("a", &[(1, Some(1)), (1, Some(2))]),
                fixed("b", &[(1, None), (1, None), (1, None)]),
            ],
        );
        let r = engine.parse(&text()).unwrap();
        assert_eq!(r.strategy_used, "a");
        assert!(!r.low_confidence);
        assert_eq!(r.attempts.len(), 1);
        assert_eq!(r.strategy_counts.len(), 1);
    }

    #[test]
    fn test_best_effort_prefers_count_then_order() {
        // Neither reconciles: balances jump by 50.
        let bad = [(1, Some(0)), (1, Some(50)), (1, Some(100))];
        let engine = ParsingEngine::with_strategies(
            ParsingConfig::default(),
            vec![fixed("a", &bad[..2]), fixed("b", &bad), fixed("c", &bad)],
        );
        let r = engine.parse(&text()).unwrap();
        assert_eq!(r.strategy_used, "b");
        assert!(r.low_confidence);
        assert_eq!(r.transactions.len(), 3);
        assert_eq!(r.reconciliation_warnings.len(), 2);
        assert_eq!(r.strategy_counts["a"], 2);
        assert_eq!(r.strategy_counts["c"], 3);
    }

    #[test]
    fn test_all_empty_is_fatal_with_zero_counts() {
        let engine = ParsingEngine::with_strategies(
            ParsingConfig::default(),
            vec![fixed("a", &[]), fixed("b", &[])],
        );
        let err = engine.parse(&text()).unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.strategy_counts.get("a"), Some(&0));
        assert_eq!(report.strategy_counts.get("b"), Some(&0));
        assert_eq!(report.normalized_text.as_deref(), Some("irrelevant"));
    }

    #[test]
    fn test_no_balance_pairs_pass_vacuously() {
        let engine = ParsingEngine::with_strategies(ParsingConfig::default(), vec![fixed("a", &[(5, None)])]);
        let r = engine.parse(&text()).unwrap();
        assert!(!r.low_confidence);
        assert_eq!(r.attempts[0].pass_rate(), 1.0);
    }
}
