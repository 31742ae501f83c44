//! Debit/credit resolution for a single movement amount.
//!
//! Evidence is taken in a fixed order: the token itself (sign, parentheses,
//! trailing minus, DR/CR), then description keywords, then the
//! running-balance delta, then the calling strategy's default.
//!
//! The delta only decides rows with no other evidence. A wrong balance on a
//! keyword row must surface as a reconciliation warning, not as a flipped
//! direction.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use ledgerlens_core::{Direction, MoneyToken};

static DEBIT_WORDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:payment|withdrawal|withdrawn|fee|fees|charge|charges|purchase|debit|",
        r"direct debit|standing order|atm|cash|bill|paid out|transfer to|card)\b",
    ))
    .expect("debit keyword regex is valid")
});

static CREDIT_WORDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:deposit|salary|payroll|wages|refund|interest|dividend|cashback|",
        r"reversal|received|paid in|transfer from|payment from|lodgement)\b",
    ))
    .expect("credit keyword regex is valid")
});

static BALANCE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:opening balance|closing balance|balance brought forward|balance carried forward|",
        r"brought forward|carried forward|previous balance|balance forward|start balance|",
        r"balance b/?f|balance c/?f|b/f|c/f)",
    ))
    .expect("balance marker regex is valid")
});

/// What decided a direction; also sets the candidate's base confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    Explicit,
    BalanceDelta,
    Keyword,
    Default,
}

impl Basis {
    pub fn confidence(self) -> f32 {
        match self {
            Basis::Explicit | Basis::BalanceDelta => 0.95,
            Basis::Keyword => 0.8,
            Basis::Default => 0.6,
        }
    }
}

/// Keyword hint from a description. Credit words win: "CARD REFUND" is money in.
pub fn keyword_direction(description: &str) -> Option<Direction> {
    if CREDIT_WORDS_RE.is_match(description) {
        Some(Direction::Credit)
    } else if DEBIT_WORDS_RE.is_match(description) {
        Some(Direction::Debit)
    } else {
        None
    }
}

/// Rows like "Opening balance" or "Balance brought forward".
pub fn is_balance_marker(description: &str) -> bool {
    BALANCE_MARKER_RE.is_match(description)
}

/// Direction implied by the move from `previous` to `balance`.
pub fn delta_direction(
    amount: Decimal,
    previous: Option<Decimal>,
    balance: Option<Decimal>,
    tolerance: Decimal,
) -> Option<Direction> {
    let delta = balance? - previous?;
    if (delta - amount).abs() <= tolerance {
        Some(Direction::Credit)
    } else if (delta + amount).abs() <= tolerance {
        Some(Direction::Debit)
    } else {
        None
    }
}

/// Inputs for resolving one movement.
pub struct Context<'a> {
    pub description: &'a str,
    pub previous_balance: Option<Decimal>,
    pub balance: Option<Decimal>,
    pub tolerance: Decimal,
    pub default: Direction,
}

pub fn resolve(token: &MoneyToken, ctx: &Context<'_>) -> (Direction, Basis) {
    if let Some(direction) = token.explicit_direction() {
        return (direction, Basis::Explicit);
    }
    if let Some(direction) = keyword_direction(ctx.description) {
        return (direction, Basis::Keyword);
    }
    if let Some(direction) = delta_direction(token.value, ctx.previous_balance, ctx.balance, ctx.tolerance) {
        return (direction, Basis::BalanceDelta);
    }
    (ctx.default, Basis::Default)
}

/// Signed balance value: DR suffix, minus or parentheses mean overdrawn.
pub fn balance_value(token: &MoneyToken) -> Decimal {
    match token.explicit_direction() {
        Some(Direction::Debit) => -token.value,
        _ => token.value,
    }
}

/// Collapse separate debit and credit column values into one movement.
///
/// When both hold a non-zero amount the net decides, so the running balance
/// still reconciles.
pub fn split_columns(debit: Option<Decimal>, credit: Option<Decimal>) -> Option<(Direction, Decimal)> {
    let debit = debit.filter(|d| !d.is_zero());
    let credit = credit.filter(|c| !c.is_zero());
    match (debit, credit) {
        (Some(d), None) => Some((Direction::Debit, d.abs())),
        (None, Some(c)) => Some((Direction::Credit, c.abs())),
        (Some(d), Some(c)) => {
            let net = c.abs() - d.abs();
            if net.is_zero() {
                None
            } else if net.is_sign_negative() {
                Some((Direction::Debit, net.abs()))
            } else {
                Some((Direction::Credit, net))
            }
        }
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlens_core::money::scan_amounts;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ctx<'a>(description: &'a str, previous: Option<&str>, balance: Option<&str>) -> Context<'a> {
        Context {
            description,
            previous_balance: previous.map(d),
            balance: balance.map(d),
            tolerance: d("0.005"),
            default: Direction::Debit,
        }
    }

    #[test]
    fn test_explicit_wins_over_everything() {
        let tok = scan_amounts("1,500.00 CR").remove(0);
        let (dir, basis) = resolve(&tok, &ctx("CARD PAYMENT", Some("100.00"), Some("50.00")));
        assert_eq!((dir, basis), (Direction::Credit, Basis::Explicit));
    }

    #[test]
    fn test_keywords_before_balance_delta() {
        let tok = scan_amounts("50.00").remove(0);
        // Balance is off by twice the amount; the delta would read it as a credit.
        let (dir, basis) = resolve(&tok, &ctx("ATM WITHDRAWAL", Some("1487.50"), Some("1537.50")));
        assert_eq!((dir, basis), (Direction::Debit, Basis::Keyword));
        let (dir, basis) = resolve(&tok, &ctx("SALARY", Some("100.00"), Some("50.00")));
        assert_eq!((dir, basis), (Direction::Credit, Basis::Keyword));
    }

    #[test]
    fn test_balance_delta_decides_rows_without_keywords() {
        let tok = scan_amounts("25.00").remove(0);
        let (dir, basis) = resolve(&tok, &ctx("ACME LTD", Some("100.00"), Some("125.00")));
        assert_eq!((dir, basis), (Direction::Credit, Basis::BalanceDelta));
        let (dir, _) = resolve(&tok, &ctx("ACME LTD", Some("100.00"), Some("75.00")));
        assert_eq!(dir, Direction::Debit);
    }

    #[test]
    fn test_keywords_then_default() {
        let tok = scan_amounts("25.00").remove(0);
        assert_eq!(resolve(&tok, &ctx("ACME SALARY", None, None)), (Direction::Credit, Basis::Keyword));
        assert_eq!(resolve(&tok, &ctx("CARD REFUND", None, None)).0, Direction::Credit);
        assert_eq!(resolve(&tok, &ctx("ATM WITHDRAWAL", None, None)).0, Direction::Debit);
        assert_eq!(resolve(&tok, &ctx("ACME LTD", None, None)), (Direction::Debit, Basis::Default));
    }

    #[test]
    fn test_balance_markers() {
        assert!(is_balance_marker("Opening Balance"));
        assert!(is_balance_marker("BALANCE BROUGHT FORWARD"));
        assert!(is_balance_marker("Balance b/f"));
        assert!(!is_balance_marker("TESCO STORES"));
    }

    #[test]
    fn test_split_columns_never_sets_both() {
        assert_eq!(split_columns(Some(d("5.00")), None), Some((Direction::Debit, d("5.00"))));
        assert_eq!(split_columns(Some(d("0.00")), Some(d("7.00"))), Some((Direction::Credit, d("7.00"))));
        assert_eq!(split_columns(Some(d("10.00")), Some(d("4.00"))), Some((Direction::Debit, d("6.00"))));
        assert_eq!(split_columns(Some(d("3.00")), Some(d("3.00"))), None);
    }

    #[test]
    fn test_overdrawn_balance_is_negative() {
        let tok = scan_amounts("50.00 DR").remove(0);
        assert_eq!(balance_value(&tok), d("-50.00"));
    }
}
