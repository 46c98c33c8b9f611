//! Report exports.
//!
//! - single report: pretty JSON, field order as declared on `RiskReport`
//! - batch results: one CSV row per counterparty, easy to pull into a spreadsheet

use std::fs::File;
use std::path::Path;

use crate::app::pipeline::Assessment;
use crate::domain::{Category, RiskReport};
use crate::error::AppError;

pub fn report_to_json(report: &RiskReport) -> Result<String, AppError> {
    serde_json::to_string_pretty(report).map_err(|e| AppError::new(4, format!("Failed to serialize report: {e}")))
}

/// Write one report as JSON.
pub fn write_report_json(path: &Path, report: &RiskReport) -> Result<(), AppError> {
    let text = report_to_json(report)?;
    std::fs::write(path, text + "\n")
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON '{}': {e}", path.display())))
}

/// Write batch results to a CSV file.
pub fn write_results_csv(path: &Path, results: &[Assessment]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec![
        "id".to_string(),
        "overall_score".to_string(),
        "risk_grade".to_string(),
        "pd".to_string(),
        "lgd".to_string(),
        "ead".to_string(),
        "expected_loss".to_string(),
    ];
    header.extend(Category::ALL.iter().map(|c| format!("{}_score", c.key())));
    header.push("pd_source".to_string());
    header.push("warnings".to_string());
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for a in results {
        let r = &a.report;
        let mut row = vec![
            a.id.clone(),
            format!("{:.1}", r.overall_score),
            r.risk_grade.clone(),
            format!("{:.6}", r.pd),
            format!("{:.6}", r.lgd_estimate),
            format!("{:.2}", r.ead),
            format!("{:.2}", r.expected_loss),
        ];
        row.extend(
            Category::ALL
                .iter()
                .map(|c| format!("{:.1}", r.component_breakdown.get(*c).sub_score)),
        );
        row.push(r.audit.pd_source.label().to_string());
        row.push(r.warnings.len().to_string());
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}
