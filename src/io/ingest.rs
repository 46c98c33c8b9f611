//! Counterparty and invoice-ledger ingest.
//!
//! - counterparty files are JSON (`Counterparty`, serde)
//! - invoice ledgers are CSV with `issue_date,due_date,paid_date,amount`
//!   columns in any order; extra columns are ignored
//!
//! Schema problems (missing columns, unreadable files) map to exit code 2;
//! malformed values fail with a [`RiskError::Data`] naming `invoices[i].<field>`,
//! where `i` is the zero-based data row.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{Counterparty, Invoice};
use crate::error::{AppError, RiskError};

const INVOICE_COLUMNS: [&str; 4] = ["issue_date", "due_date", "paid_date", "amount"];

/// Read a counterparty JSON file.
pub fn load_counterparty(path: &Path) -> Result<Counterparty, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read counterparty '{}': {e}", path.display())))?;
    Ok(parse_counterparty(&text)?)
}

pub fn parse_counterparty(text: &str) -> Result<Counterparty, RiskError> {
    serde_json::from_str(text).map_err(|e| RiskError::data("counterparty", e.to_string()))
}

/// Read an invoice ledger CSV file.
pub fn load_invoices(path: &Path) -> Result<Vec<Invoice>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open invoice CSV '{}': {e}", path.display())))?;
    Ok(read_invoices(file)?)
}

/// Parse an invoice ledger from any reader.
pub fn read_invoices<R: Read>(source: R) -> Result<Vec<Invoice>, RiskError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| RiskError::data("invoices", format!("cannot read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let missing: Vec<String> = INVOICE_COLUMNS
        .iter()
        .filter(|c| **c != "paid_date" && !header_map.contains_key(**c))
        .map(|c| format!("invoices.{c}"))
        .collect();
    if !missing.is_empty() {
        return Err(RiskError::Validation {
            fields: missing,
            reason: "required CSV column absent".to_string(),
        });
    }

    let mut out = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| RiskError::data(format!("invoices[{i}]"), format!("CSV parse error: {e}")))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        out.push(parse_invoice(i, &record, &header_map)?);
    }
    Ok(out)
}

fn parse_invoice(i: usize, record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<Invoice, RiskError> {
    let field = |name: &str| header_map.get(name).and_then(|&idx| record.get(idx)).filter(|s| !s.is_empty());
    let required = |name: &str| {
        field(name).ok_or_else(|| RiskError::data(format!("invoices[{i}].{name}"), "value is empty"))
    };

    let issue_date = parse_date(i, "issue_date", required("issue_date")?)?;
    let due_date = parse_date(i, "due_date", required("due_date")?)?;
    let paid_date = match field("paid_date") {
        Some(s) if !is_null(s) => Some(parse_date(i, "paid_date", s)?),
        _ => None,
    };
    let raw_amount = required("amount")?;
    let amount = raw_amount
        .replace(['_', ','], "")
        .parse::<f64>()
        .map_err(|_| RiskError::data(format!("invoices[{i}].amount"), format!("not a number: '{raw_amount}'")))?;

    Ok(Invoice {
        issue_date,
        due_date,
        paid_date,
        amount,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn is_null(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "null" | "none" | "na" | "n/a" | "-")
}

fn parse_date(i: usize, name: &str, s: &str) -> Result<NaiveDate, RiskError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| RiskError::data(format!("invoices[{i}].{name}"), format!("expected YYYY-MM-DD, got '{s}'")))
}
