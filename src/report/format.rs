//! Terminal formatting for reports and portfolio rankings.
//!
//! Formatting lives here so the scoring code stays free of presentation and
//! output changes are localized.

use crate::app::pipeline::{Assessment, BatchOutput};
use crate::config::WeightConfig;
use crate::domain::{Category, RiskReport};

/// Riskiest and safest names (top-N each side).
#[derive(Debug, Clone)]
pub struct Rankings {
    pub riskiest: Vec<Assessment>,
    pub safest: Vec<Assessment>,
}

/// Rank by overall score; ties break on expected loss, then id, so the
/// order never depends on batch scheduling.
pub fn rank_portfolio(assessments: &[Assessment], top_n: usize) -> Rankings {
    let mut sorted = assessments.to_vec();
    sorted.sort_by(|a, b| {
        a.report
            .overall_score
            .partial_cmp(&b.report.overall_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.report
                    .expected_loss
                    .partial_cmp(&a.report.expected_loss)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    let riskiest = sorted.iter().take(top_n).cloned().collect();
    let safest = sorted.iter().rev().take(top_n).cloned().collect();
    Rankings { riskiest, safest }
}

/// Full single-counterparty report.
pub fn format_report(id: &str, report: &RiskReport) -> String {
    let mut out = String::new();
    let audit = &report.audit;

    out.push_str("=== rift - Counterparty Risk Report ===\n");
    out.push_str(&format!("Counterparty: {id}\n"));
    out.push_str(&format!("Config: {} {}\n", audit.config_name, audit.config_version));
    out.push_str(&format!(
        "Score: {:.1} ({})",
        report.overall_score, report.risk_grade
    ));
    if let Some(o) = &audit.score_override {
        out.push_str(&format!(" | base {:.1}, override {:+.1}: {}", audit.base_score, o.delta, o.reason));
    }
    out.push('\n');
    out.push_str(&format!(
        "PD: {:.4}% [{}{}] model={}\n",
        report.pd * 100.0,
        audit.pd_source.label(),
        if audit.pd_low_confidence { ", low confidence" } else { "" },
        audit.pd_model_version
    ));
    out.push_str(&format!("LGD: {:.2}%\n", report.lgd_estimate * 100.0));
    out.push_str(&format!(
        "EAD: {:.2} | Expected loss: {:.2}\n",
        report.ead, report.expected_loss
    ));
    out.push_str(&format!("Data confidence: {:.0}%\n", audit.data_confidence * 100.0));

    out.push_str("\nCategories:\n");
    out.push_str(
        format!(
            "{:<22} {:>7} {:>7} {:>7} {:>6}  {}\n",
            "category", "score", "weight", "points", "conf", "drivers"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<22} {:-<7} {:-<7} {:-<7} {:-<6}  {:-<24}\n", "", "", "", "", "", "").trim_end());
    out.push('\n');
    for category in Category::ALL {
        let b = report.component_breakdown.get(category);
        let drivers: Vec<String> = b
            .drivers
            .iter()
            .map(|d| format!("{}={} (-{:.1})", d.feature, fmt_value(d.value), d.points_lost))
            .collect();
        out.push_str(
            format!(
                "{:<22} {:>7.1} {:>7.2} {:>7.1} {:>5.0}%  {}\n",
                category.display_name(),
                b.sub_score,
                b.weight,
                b.contribution,
                b.confidence * 100.0,
                drivers.join(", ")
            )
            .trim_end(),
        );
        out.push('\n');
    }

    if !report.warnings.is_empty() {
        out.push_str(&format!("\nWarnings ({}):\n", report.warnings.len()));
        for w in &report.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }
    out
}

/// Portfolio-level summary: counts, grade distribution, totals.
pub fn format_batch_summary(batch: &BatchOutput, config: &WeightConfig, count: usize, seed: u64) -> String {
    let mut out = String::new();
    out.push_str("=== rift - Portfolio Batch ===\n");
    out.push_str(&format!("Config: {} {}\n", config.name, config.version));
    out.push_str(&format!(
        "Sample: n={count} seed={seed} | scored={} rejected={}\n",
        batch.assessments.len(),
        batch.failures.len()
    ));

    let total_ead: f64 = batch.assessments.iter().map(|a| a.report.ead).sum();
    let total_el: f64 = batch.assessments.iter().map(|a| a.report.expected_loss).sum();
    out.push_str(&format!("EAD: {total_ead:.2} | Expected loss: {total_el:.2}"));
    if total_ead > 0.0 {
        out.push_str(&format!(" ({:.3}% of EAD)", total_el / total_ead * 100.0));
    }
    out.push('\n');

    out.push_str("\nGrades:\n");
    for band in &config.grades {
        let n = batch
            .assessments
            .iter()
            .filter(|a| a.report.risk_grade == band.label)
            .count();
        out.push_str(&format!("{:<6} {:>5}\n", band.label, n));
    }

    if !batch.failures.is_empty() {
        out.push_str("\nRejected:\n");
        for (id, err) in &batch.failures {
            out.push_str(&format!("- {id}: {err}\n"));
        }
    }
    out.push('\n');
    out
}

/// Riskiest/safest tables.
pub fn format_rankings(rankings: &Rankings) -> String {
    let mut out = String::new();

    out.push_str("Riskiest (lowest score):\n");
    out.push_str(&format_table(&rankings.riskiest));
    out.push('\n');

    out.push_str("Safest (highest score):\n");
    out.push_str(&format_table(&rankings.safest));

    out
}

fn format_table(rows: &[Assessment]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<16} {:>6} {:<5} {:>9} {:>7} {:>14} {:>14} {:>5}\n",
            "id", "score", "grade", "pd%", "lgd%", "ead", "exp_loss", "warn"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<16} {:-<6} {:-<5} {:-<9} {:-<7} {:-<14} {:-<14} {:-<5}\n",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for a in rows {
        let r = &a.report;
        out.push_str(
            format!(
                "{:<16} {:>6.1} {:<5} {:>9.4} {:>7.2} {:>14.2} {:>14.2} {:>5}\n",
                truncate(&a.id, 16),
                r.overall_score,
                r.risk_grade,
                r.pd * 100.0,
                r.lgd_estimate * 100.0,
                r.ead,
                r.expected_loss,
                r.warnings.len(),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
