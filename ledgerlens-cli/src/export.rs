//! CSV and JSON output.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ledgerlens_core::dates::CANONICAL_FORMAT;
use ledgerlens_core::{ConversionError, ErrorKind, FailureReport, TransactionCandidate};
use ledgerlens_parse::Conversion;

const HEADER: [&str; 5] = ["Date", "Description", "Debit", "Credit", "Balance"];

fn amount(value: Option<Decimal>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn date(d: NaiveDate) -> String {
    d.format(CANONICAL_FORMAT).to_string()
}

pub fn write_csv<W: Write>(writer: W, transactions: &[TransactionCandidate]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for t in transactions {
        wtr.write_record([
            date(t.date),
            t.description.clone(),
            amount(t.debit()),
            amount(t.credit()),
            amount(t.balance),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv_file(path: &Path, transactions: &[TransactionCandidate]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_csv(BufWriter::new(file), transactions).with_context(|| format!("write {}", path.display()))
}

/// Failure shape relayed to callers instead of a Conversion.
#[derive(Debug, Serialize)]
struct FailureJson<'a> {
    error: ErrorKind,
    message: String,
    report: Option<&'a FailureReport>,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, value).with_context(|| format!("write {}", path.display()))?;
    w.flush()?;
    Ok(())
}

pub fn write_conversion_json(path: &Path, conversion: &Conversion) -> Result<()> {
    write_json(path, conversion)
}

pub fn write_failure_json(path: &Path, err: &ConversionError) -> Result<()> {
    write_json(
        path,
        &FailureJson {
            error: err.kind(),
            message: err.to_string(),
            report: err.report(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlens_core::{Direction, SourceSpan};

    fn cand(desc: &str, movement: Option<(Direction, &str)>, balance: Option<&str>) -> TransactionCandidate {
        TransactionCandidate::new(
            NaiveDate::from_ymd_opt(2023, 6, 5).unwrap(),
            desc,
            movement.map(|(d, v)| (d, v.parse().unwrap())),
            balance.map(|b| b.parse().unwrap()),
            SourceSpan::line(0, 0),
            1.0,
        )
    }

    #[test]
    fn test_csv_columns_and_blanks() {
        let rows = vec![
            cand("Opening balance", None, Some("1000")),
            cand("TESCO, STORES", Some((Direction::Debit, "12.5")), Some("987.5")),
            cand("REFUND", Some((Direction::Credit, "2.50")), None),
        ];
        let mut out = Vec::new();
        write_csv(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,Description,Debit,Credit,Balance");
        assert_eq!(lines[1], "2023-06-05,Opening balance,,,1000.00");
        assert_eq!(lines[2], "2023-06-05,\"TESCO, STORES\",12.50,,987.50");
        assert_eq!(lines[3], "2023-06-05,REFUND,,2.50,");
    }

    #[test]
    fn test_failure_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("failure.json");
        let err = ConversionError::NoTransactionsParsed(Box::default());
        write_failure_json(&p, &err).unwrap();
        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&p).unwrap()).unwrap();
        assert_eq!(v["error"], "no_transactions_parsed");
        assert!(v["report"]["strategy_counts"].is_object());
    }
}
