//! Running-balance reconciliation.
//!
//! For each consecutive pair where both candidates carry a balance,
//! `balance[i] == balance[i-1] + credit[i] - debit[i]` must hold within the
//! tolerance. Mismatches become warnings; nothing is dropped.

use rust_decimal::Decimal;

use ledgerlens_core::{ReconciliationWarning, TransactionCandidate};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub checked_pairs: usize,
    pub reconciled_pairs: usize,
    pub warnings: Vec<ReconciliationWarning>,
}

pub fn reconcile(candidates: &[TransactionCandidate], tolerance: Decimal) -> Reconciliation {
    let mut out = Reconciliation::default();

    for (i, pair) in candidates.windows(2).enumerate() {
        let (prev, cur) = (&pair[0], &pair[1]);
        let (Some(before), Some(actual)) = (prev.balance, cur.balance) else {
            continue;
        };
        out.checked_pairs += 1;

        let expected = before + cur.net();
        let difference = actual - expected;
        if difference.abs() <= tolerance {
            out.reconciled_pairs += 1;
        } else {
            out.warnings.push(ReconciliationWarning {
                candidate_index: i + 1,
                previous_index: i,
                line: cur.span.start_line,
                expected,
                actual,
                difference,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ledgerlens_core::{Direction, SourceSpan};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn cand(line: usize, movement: Option<(Direction, &str)>, balance: Option<&str>) -> TransactionCandidate {
        TransactionCandidate::new(
            NaiveDate::from_ymd_opt(2023, 6, 5).unwrap(),
            "x",
            movement.map(|(dir, v)| (dir, d(v))),
            balance.map(d),
            SourceSpan::line(0, line),
            1.0,
        )
    }

    #[test]
    fn test_all_pairs_reconcile() {
        let c = vec![
            cand(0, None, Some("100.00")),
            cand(1, Some((Direction::Debit, "12.50")), Some("87.50")),
            cand(2, Some((Direction::Credit, "2.50")), Some("90.00")),
        ];
        let r = reconcile(&c, d("0.005"));
        assert_eq!((r.checked_pairs, r.reconciled_pairs), (2, 2));
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_mismatch_is_a_warning_not_a_drop() {
        let c = vec![
            cand(0, Some((Direction::Debit, "10.00")), Some("90.00")),
            cand(1, Some((Direction::Debit, "10.00")), Some("80.00")),
            cand(4, Some((Direction::Debit, "10.00")), Some("170.00")),
        ];
        let r = reconcile(&c, d("0.005"));
        assert_eq!(r.checked_pairs, 2);
        assert_eq!(r.warnings.len(), 1);
        let w = &r.warnings[0];
        assert_eq!((w.candidate_index, w.previous_index, w.line), (2, 1, 4));
        assert_eq!(w.expected, d("70.00"));
        assert_eq!(w.difference, d("100.00"));
    }

    #[test]
    fn test_pairs_without_balances_are_skipped() {
        let c = vec![
            cand(0, Some((Direction::Debit, "10.00")), Some("90.00")),
            cand(1, Some((Direction::Debit, "10.00")), None),
            cand(2, Some((Direction::Debit, "10.00")), Some("70.00")),
        ];
        let r = reconcile(&c, d("0.005"));
        assert_eq!(r.checked_pairs, 0);
    }

    #[test]
    fn test_within_tolerance() {
        let c = vec![
            cand(0, None, Some("10.000")),
            cand(1, Some((Direction::Credit, "1.00")), Some("11.004")),
        ];
        assert_eq!(reconcile(&c, d("0.005")).reconciled_pairs, 1);
    }
}
