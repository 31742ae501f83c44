use rust_decimal::Decimal;

use ledgerlens_core::{ErrorKind, NormalizedText, ParsingConfig};
use ledgerlens_parse::{ParsingEngine, normalize_text};

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn engine() -> ParsingEngine {
    ParsingEngine::new(ParsingConfig::default())
}

fn normalized(raw: &str) -> NormalizedText {
    NormalizedText::from_plain(normalize_text(raw))
}

#[test]
fn test_three_reconciling_lines_use_standard() {
    let text = normalized(
        "05/06/2023 CARD PAYMENT TESCO 12.50 987.50\n\
         06/06/2023 SALARY ACME LTD 500.00 1,487.50\n\
         07/06/2023 ATM WITHDRAWAL 40.00 1,447.50\n",
    );
    let r = engine().parse(&text).unwrap();
    assert_eq!(r.transactions.len(), 3);
    assert_eq!(r.strategy_used, "standard");
    assert!(r.reconciliation_warnings.is_empty());
    assert!(!r.low_confidence);
    assert_eq!(r.transactions[0].debit(), Some(d("12.50")));
    assert_eq!(r.transactions[1].credit(), Some(d("500.00")));
    assert_eq!(r.transactions[2].debit(), Some(d("40.00")));
}

#[test]
fn test_bad_third_balance_warns_once() {
    let text = normalized(
        "05/06/2023 CARD PAYMENT TESCO 12.50 987.50\n\
         06/06/2023 SALARY ACME LTD 500.00 1,487.50\n\
         07/06/2023 ATM WITHDRAWAL 40.00 1,547.50\n",
    );
    let r = engine().parse(&text).unwrap();
    assert_eq!(r.transactions.len(), 3);
    assert_eq!(r.reconciliation_warnings.len(), 1);
    let w = &r.reconciliation_warnings[0];
    assert_eq!((w.previous_index, w.candidate_index), (1, 2));
    assert_eq!(w.difference, d("100.00"));
}

#[test]
fn test_balance_off_by_twice_the_amount_still_warns() {
    // 1,487.50 + 50.00 would reconcile if the withdrawal were read as money in.
    let text = normalized(
        "05/06/2023 CARD PAYMENT TESCO 12.50 987.50\n\
         06/06/2023 SALARY ACME LTD 500.00 1,487.50\n\
         07/06/2023 ATM WITHDRAWAL 50.00 1,537.50\n",
    );
    let r = engine().parse(&text).unwrap();
    let third = &r.transactions[2];
    assert_eq!(third.debit(), Some(d("50.00")));
    assert_eq!(third.credit(), None);
    assert_eq!(r.reconciliation_warnings.len(), 1);
    let w = &r.reconciliation_warnings[0];
    assert_eq!((w.previous_index, w.candidate_index), (1, 2));
    assert_eq!(w.difference, d("100.00"));
}

#[test]
fn test_nothing_parsed_reports_every_strategy() {
    let text = normalized("Statement of account\nThank you for banking with us\n");
    let err = engine().parse(&text).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoTransactionsParsed);
    let report = err.report().unwrap();
    for name in ["standard", "tabular", "line"] {
        assert_eq!(report.strategy_counts.get(name), Some(&0), "{name}");
    }
    // Diagnostics must survive a trip through the transport layer.
    let json = serde_json::to_value(report).unwrap();
    assert_eq!(json["strategy_counts"]["line"], 0);
}

#[test]
fn test_cheque_register_falls_through_to_tabular() {
    // Rows have no words, so the standard shape does not match.
    let text = normalized(
        "Date    Cheque No    Amount    Balance\n\
         05 Jun 2023    100234    12.50    987.50\n\
         06 Jun 2023    100235    2.50-    985.00\n",
    );
    let r = engine().parse(&text).unwrap();
    assert_eq!(r.strategy_used, "tabular");
    assert_eq!(r.strategy_counts["standard"], 0);
    assert_eq!(r.transactions.len(), 2);
    assert_eq!(r.transactions[0].description, "100234");
    assert_eq!(r.transactions[1].debit(), Some(d("2.50")));
    assert!(r.reconciliation_warnings.is_empty());
}

#[test]
fn test_debit_and_credit_never_both_set() {
    let text = normalized(
        "2023-06-05 TRANSFER 10.00 4.00 94.00\n\
         2023-06-06 FEE (1.00) 93.00\n\
         2023-06-07 MISC 7.00 CR 100.00\n",
    );
    let r = engine().parse(&text).unwrap();
    assert_eq!(r.transactions.len(), 3);
    for t in &r.transactions {
        assert!(!(t.debit().is_some() && t.credit().is_some()), "{t:?}");
    }
    assert_eq!(r.transactions[0].debit(), Some(d("6.00")));
}

#[test]
fn test_date_formats_normalize_to_canonical() {
    let text = normalize_text("05/06/2023 A 1.00\n05 Jun 2023 B 2.00\n");
    let dates: Vec<&str> = text.lines().map(|l| &l[..10]).collect();
    assert_eq!(dates, ["2023-06-05", "2023-06-05"]);
}

#[test]
fn test_transactions_keep_document_order() {
    let text = normalized(
        "2023-06-07 LATER ENTRY 1.00\n\
         2023-06-05 EARLIER ENTRY 2.00\n",
    );
    let r = engine().parse(&text).unwrap();
    assert_eq!(r.transactions[0].description, "LATER ENTRY");
    assert_eq!(r.transactions[1].description, "EARLIER ENTRY");
}
