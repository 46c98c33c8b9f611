//! Payment behaviour features from an invoice ledger.
//!
//! Days late are measured on paid invoices only (`paid − due`, floored at 0).
//! Unpaid invoices are outstanding; once past due they land in a
//! days-past-due bucket relative to the evaluation date. A payment dated
//! after the evaluation date had not happened yet and is treated as unpaid.
//!
//! This vector also feeds the PD estimator, so its raw features are part of
//! the model contract: renaming one is a model-version change.

use chrono::NaiveDate;

use crate::config::PaymentRules;
use crate::domain::{Category, FeatureDomain, FeatureVector, Invoice};
use crate::error::RiskError;
use crate::math::{mean, median, weighted_mean};

const DPD_BUCKETS: [&str; 4] = ["dpd_1_30", "dpd_31_60", "dpd_61_90", "dpd_90_plus"];

/// Overdue invoices per bucket and the delinquency points each bucket costs.
#[derive(Debug, Default)]
struct DpdBuckets {
    counts: [u32; 4],
    points: [f64; 4],
    max: u32,
}

pub fn compute_payment_features(
    invoices: &[Invoice],
    asof: NaiveDate,
    rules: &PaymentRules,
) -> Result<FeatureVector, RiskError> {
    for (i, inv) in invoices.iter().enumerate() {
        validate_invoice(i, inv)?;
    }

    let n = invoices.len();
    let total_amount: f64 = invoices.iter().map(|inv| inv.amount).sum();

    let mut days_late = Vec::new();
    let mut weighted_late = Vec::new();
    let mut late_count = 0usize;
    let mut late_amount = 0.0;
    let mut outstanding_count = 0usize;
    let mut outstanding_amount = 0.0;
    let mut overdue_amount = 0.0;
    let mut dpd = DpdBuckets::default();

    for inv in invoices {
        match inv.paid_date.filter(|paid| *paid <= asof) {
            Some(paid) => {
                let late = (paid - inv.due_date).num_days().max(0) as f64;
                days_late.push(late);
                weighted_late.push((late, inv.amount));
                if late > 0.0 {
                    late_count += 1;
                    late_amount += inv.amount;
                }
            }
            None => {
                outstanding_count += 1;
                outstanding_amount += inv.amount;
                let past_due = (asof - inv.due_date).num_days();
                if past_due > 0 {
                    let past_due = u32::try_from(past_due).unwrap_or(u32::MAX);
                    overdue_amount += inv.amount;
                    let (bucket, penalty) = match past_due {
                        1..=30 => (0, rules.dpd_penalties.dpd_1_30),
                        31..=60 => (1, rules.dpd_penalties.dpd_31_60),
                        61..=90 => (2, rules.dpd_penalties.dpd_61_90),
                        _ => (3, rules.dpd_penalties.dpd_90_plus),
                    };
                    dpd.counts[bucket] += 1;
                    dpd.points[bucket] += inv.amount / total_amount * penalty;
                    dpd.max = dpd.max.max(past_due);
                }
            }
        }
    }

    let share = |part: f64| if total_amount > 0.0 { part / total_amount } else { 0.0 };
    let frac = |count: usize| if n > 0 { count as f64 / n as f64 } else { 0.0 };

    let mean_late = mean(&days_late).unwrap_or(0.0);
    let median_late = median(&days_late).unwrap_or(0.0);
    let weighted_days_late = weighted_mean(&weighted_late).unwrap_or(0.0);
    let late_fraction_amount = share(late_amount);
    let insufficient = (n as u64) < u64::from(rules.min_invoice_count);

    let mut b = FeatureVector::builder(Category::Payment);
    b.push_count("invoice_count", count_u32(n))?;
    b.push_count("paid_count", count_u32(days_late.len()))?;
    b.push("total_amount", total_amount, FeatureDomain::NonNegative)?;
    b.push("mean_days_late", mean_late, FeatureDomain::NonNegative)?;
    b.push("median_days_late", median_late, FeatureDomain::NonNegative)?;
    b.push("weighted_days_late", weighted_days_late, FeatureDomain::NonNegative)?;
    b.push("late_fraction", frac(late_count), FeatureDomain::Probability)?;
    b.push("late_fraction_amount", late_fraction_amount, FeatureDomain::Probability)?;
    b.push("outstanding_fraction", frac(outstanding_count), FeatureDomain::Probability)?;
    b.push(
        "outstanding_fraction_amount",
        share(outstanding_amount),
        FeatureDomain::Probability,
    )?;
    b.push("overdue_fraction_amount", share(overdue_amount), FeatureDomain::Probability)?;
    for (name, count) in DPD_BUCKETS.iter().zip(dpd.counts) {
        b.push_count(name, count)?;
    }
    b.push_count("max_dpd", dpd.max)?;
    b.push_flag("insufficient_history", insufficient)?;

    if insufficient {
        b.warn(
            "invoice_count",
            format!(
                "{n} invoice(s), below the minimum of {}; payment scores use the insufficient-history fallback",
                rules.min_invoice_count
            ),
        );
        let fallback = rules.insufficient_history_score;
        let lost = [("invoice_count", 100.0 - fallback)];
        b.push_score("punctuality_score", fallback.clamp(0.0, 100.0), &lost)?;
        b.push_score("delinquency_score", fallback.clamp(0.0, 100.0), &lost)?;
        return Ok(b.build());
    }

    let timeliness = rules.days_late.score(weighted_days_late);
    let late_loss = timeliness * rules.late_penalty * late_fraction_amount;
    b.push_score(
        "punctuality_score",
        (timeliness - late_loss).clamp(0.0, 100.0),
        &[
            ("weighted_days_late", 100.0 - timeliness),
            ("late_fraction_amount", late_loss),
        ],
    )?;

    // Most severe bucket first so equal losses rank by severity.
    let delinquency_lost: Vec<(&str, f64)> = DPD_BUCKETS
        .iter()
        .zip(dpd.points)
        .rev()
        .map(|(name, points)| (*name, points))
        .collect();
    let delinquency = 100.0 - dpd.points.iter().sum::<f64>();
    b.push_score("delinquency_score", delinquency.clamp(0.0, 100.0), &delinquency_lost)?;
    Ok(b.build())
}

fn validate_invoice(i: usize, inv: &Invoice) -> Result<(), RiskError> {
    if !(inv.amount.is_finite() && inv.amount > 0.0) {
        return Err(RiskError::data(
            format!("invoices[{i}].amount"),
            format!("amount must be finite and > 0, got {}", inv.amount),
        ));
    }
    if inv.due_date < inv.issue_date {
        return Err(RiskError::data(
            format!("invoices[{i}].due_date"),
            format!("due date {} precedes issue date {}", inv.due_date, inv.issue_date),
        ));
    }
    if let Some(paid) = inv.paid_date {
        if paid < inv.issue_date {
            return Err(RiskError::data(
                format!("invoices[{i}].paid_date"),
                format!("paid date {paid} precedes issue date {}", inv.issue_date),
            ));
        }
    }
    Ok(())
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightConfig;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn inv(issue: &str, due: &str, paid: Option<&str>, amount: f64) -> Invoice {
        Invoice {
            issue_date: d(issue),
            due_date: d(due),
            paid_date: paid.map(d),
            amount,
        }
    }

    fn worked_ledger() -> Vec<Invoice> {
        vec![
            inv("2025-06-01", "2025-07-01", Some("2025-06-28"), 50_000.0),
            inv("2025-07-10", "2025-08-10", Some("2025-08-15"), 60_000.0),
            inv("2025-08-20", "2025-09-20", None, 40_000.0),
        ]
    }

    #[test]
    fn worked_example_features() {
        let rules = WeightConfig::default().rules.payment;
        let v = compute_payment_features(&worked_ledger(), d("2025-10-15"), &rules).unwrap();

        assert_eq!(v.get("invoice_count"), Some(3.0));
        assert_eq!(v.get("paid_count"), Some(2.0));
        assert_eq!(v.get("mean_days_late"), Some(2.5));
        assert!((v.get("weighted_days_late").unwrap() - 300_000.0 / 110_000.0).abs() < 1e-9);
        assert!((v.get("late_fraction").unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert!((v.get("late_fraction_amount").unwrap() - 0.4).abs() < 1e-12);
        assert!((v.get("overdue_fraction_amount").unwrap() - 40.0 / 150.0).abs() < 1e-12);
        assert_eq!(v.get("dpd_1_30"), Some(1.0));
        assert_eq!(v.get("max_dpd"), Some(25.0));
        assert_eq!(v.get("insufficient_history"), Some(0.0));

        let punctuality = v.get("punctuality_score").unwrap();
        assert!((punctuality - 76.3636).abs() < 1e-3, "got {punctuality}");
        let delinquency = v.get("delinquency_score").unwrap();
        assert!((delinquency - 93.3333).abs() < 1e-3, "got {delinquency}");
    }

    #[test]
    fn empty_ledger_uses_fallback_with_warning() {
        let rules = WeightConfig::default().rules.payment;
        let v = compute_payment_features(&[], d("2025-10-15"), &rules).unwrap();
        assert_eq!(v.get("invoice_count"), Some(0.0));
        assert_eq!(v.get("insufficient_history"), Some(1.0));
        assert_eq!(v.get("punctuality_score"), Some(rules.insufficient_history_score));
        assert_eq!(v.get("delinquency_score"), Some(rules.insufficient_history_score));
        assert_eq!(v.warnings().len(), 1);
        assert_eq!(v.warnings()[0].field, "payment.invoice_count");
    }

    #[test]
    fn due_before_issue_is_a_data_error() {
        let rules = WeightConfig::default().rules.payment;
        let mut ledger = worked_ledger();
        ledger[1].due_date = d("2025-07-01");
        let err = compute_payment_features(&ledger, d("2025-10-15"), &rules).unwrap_err();
        assert!(matches!(err, RiskError::Data { .. }));
        assert_eq!(err.fields(), vec!["invoices[1].due_date"]);
    }

    #[test]
    fn paid_before_issue_is_a_data_error() {
        let rules = WeightConfig::default().rules.payment;
        let mut ledger = worked_ledger();
        ledger[0].paid_date = Some(d("2025-05-20"));
        let err = compute_payment_features(&ledger, d("2025-10-15"), &rules).unwrap_err();
        assert!(matches!(err, RiskError::Data { .. }));
        assert_eq!(err.fields(), vec!["invoices[0].paid_date"]);
    }

    #[test]
    fn non_positive_amount_is_a_data_error() {
        let rules = WeightConfig::default().rules.payment;
        let mut ledger = worked_ledger();
        ledger[2].amount = 0.0;
        let err = compute_payment_features(&ledger, d("2025-10-15"), &rules).unwrap_err();
        assert_eq!(err.fields(), vec!["invoices[2].amount"]);
    }

    #[test]
    fn payment_after_evaluation_date_counts_as_unpaid() {
        let rules = WeightConfig::default().rules.payment;
        let ledger = vec![inv("2025-01-01", "2025-02-01", Some("2025-06-01"), 1_000.0)];
        let v = compute_payment_features(&ledger, d("2025-05-01"), &rules).unwrap();
        assert_eq!(v.get("paid_count"), Some(0.0));
        assert_eq!(v.get("outstanding_fraction"), Some(1.0));
        assert_eq!(v.get("dpd_61_90"), Some(1.0));
        assert_eq!(v.get("max_dpd"), Some(89.0));
    }

    #[test]
    fn overdue_invoices_fill_every_bucket() {
        let rules = WeightConfig::default().rules.payment;
        let asof = d("2025-12-31");
        let ledger = vec![
            inv("2025-11-01", "2025-12-21", None, 100.0),
            inv("2025-10-01", "2025-11-21", None, 100.0),
            inv("2025-09-01", "2025-10-21", None, 100.0),
            inv("2025-01-01", "2025-02-01", None, 100.0),
            inv("2025-12-01", "2026-01-31", None, 100.0),
        ];
        let v = compute_payment_features(&ledger, asof, &rules).unwrap();
        assert_eq!(v.get("dpd_1_30"), Some(1.0));
        assert_eq!(v.get("dpd_31_60"), Some(1.0));
        assert_eq!(v.get("dpd_61_90"), Some(1.0));
        assert_eq!(v.get("dpd_90_plus"), Some(1.0));
        // The last invoice is outstanding but not yet due.
        assert_eq!(v.get("outstanding_fraction"), Some(1.0));
        assert!((v.get("overdue_fraction_amount").unwrap() - 0.8).abs() < 1e-12);
        // 100 - 0.2 × (25 + 50 + 75 + 100)
        assert!((v.get("delinquency_score").unwrap() - 50.0).abs() < 1e-9);

        let lost: Vec<(&str, f64)> = v
            .feature("delinquency_score")
            .unwrap()
            .inputs
            .iter()
            .map(|i| (i.feature.as_str(), i.points_lost))
            .collect();
        let names: Vec<&str> = lost.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["dpd_90_plus", "dpd_61_90", "dpd_31_60", "dpd_1_30"]);
        assert!((lost[0].1 - 20.0).abs() < 1e-9);
        assert!((lost[3].1 - 5.0).abs() < 1e-9);
    }

    #[test]
    fn paying_late_never_raises_punctuality() {
        let rules = WeightConfig::default().rules.payment;
        let asof = d("2025-12-31");
        let base = vec![
            inv("2025-01-01", "2025-02-01", Some("2025-01-30"), 10_000.0),
            inv("2025-03-01", "2025-04-01", Some("2025-04-01"), 25_000.0),
            inv("2025-05-01", "2025-06-01", Some("2025-06-09"), 5_000.0),
        ];
        let before = compute_payment_features(&base, asof, &rules)
            .unwrap()
            .get("punctuality_score")
            .unwrap();

        for idx in [0, 1] {
            for delay in [1, 7, 30, 120] {
                let mut ledger = base.clone();
                ledger[idx].paid_date = Some(ledger[idx].due_date + chrono::Duration::days(delay));
                let after = compute_payment_features(&ledger, asof, &rules)
                    .unwrap()
                    .get("punctuality_score")
                    .unwrap();
                assert!(after <= before, "invoice {idx} delayed {delay}d raised punctuality");
            }
        }
    }
}
