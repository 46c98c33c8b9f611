//! Trade execution features and the insurance-driven loss mitigation factor.

use crate::config::TradeRules;
use crate::domain::{Category, FeatureDomain, FeatureVector, InsuranceTerms, ShipmentStatus, TradeFlow};
use crate::error::RiskError;

/// Build the trade-flow feature vector.
///
/// `loss_mitigation_factor = insured × payout × (1 − deductible)` is only
/// emitted when insurance terms are supplied; the aggregator treats its
/// absence as zero mitigation.
pub fn compute_trade_flow_features(
    flow: &TradeFlow,
    insurance: Option<&InsuranceTerms>,
    rules: &TradeRules,
) -> Result<FeatureVector, RiskError> {
    let mut missing = Vec::new();
    if flow.delivered.is_none() {
        missing.push("trade.delivered".to_string());
    }
    if flow.status.is_none() {
        missing.push("trade.status".to_string());
    }
    if flow.loss_ratio.is_none() {
        missing.push("trade.loss_ratio".to_string());
    }
    if !missing.is_empty() {
        return Err(RiskError::missing(missing));
    }
    let delivered = flow.delivered.unwrap_or_default();
    let loss_ratio = flow.loss_ratio.unwrap_or_default();
    let status: ShipmentStatus = flow.status.as_deref().unwrap_or_default().parse()?;
    check_ratio("trade.loss_ratio", loss_ratio)?;

    let status_score = rules.status_scores.score(status.label()).ok_or_else(|| {
        RiskError::config(
            "rules.trade.status_scores",
            format!("no score for status '{}'", status.label()),
        )
    })?;
    let loss_score = rules.loss_ratio.score(loss_ratio);
    let blended = rules.status_weight * status_score + (1.0 - rules.status_weight) * loss_score;
    let execution = if delivered {
        blended
    } else {
        blended * rules.undelivered_factor
    };

    let mut b = FeatureVector::builder(Category::Trade);
    b.push_flag("delivered", delivered)?;
    b.push("status_score", status_score, FeatureDomain::Score)?;
    b.push("loss_ratio", loss_ratio, FeatureDomain::Probability)?;

    if delivered != (status == ShipmentStatus::Delivered) {
        b.warn(
            "delivered",
            format!("delivered={delivered} contradicts shipment status {}", status.label()),
        );
    }

    match insurance {
        Some(terms) => {
            check_ratio("trade.insured_ratio", terms.insured_ratio)?;
            check_ratio("trade.payout_prob", terms.payout_prob)?;
            check_ratio("trade.deductible_ratio", terms.deductible_ratio)?;
            let factor = terms.insured_ratio * terms.payout_prob * (1.0 - terms.deductible_ratio);
            b.push("insured_ratio", terms.insured_ratio, FeatureDomain::Probability)?;
            b.push("loss_mitigation_factor", factor, FeatureDomain::Probability)?;
        }
        None => b.warn("loss_mitigation_factor", "no insurance terms; no loss mitigation applied"),
    }

    b.push_score(
        "execution_score",
        execution.clamp(0.0, 100.0),
        &[
            ("status_score", rules.status_weight * (100.0 - status_score)),
            ("loss_ratio", (1.0 - rules.status_weight) * (100.0 - loss_score)),
            ("delivered", blended - execution),
        ],
    )?;
    Ok(b.build())
}

fn check_ratio(field: &str, value: f64) -> Result<(), RiskError> {
    if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
        return Err(RiskError::validation(field, format!("must be in [0, 1], got {value}")));
    }
    Ok(())
}
