//! Risk aggregation: five category feature vectors plus a PD estimate in,
//! one [`RiskReport`] out.
//!
//! Structural problems (wrong vector in a slot, a required component absent,
//! an invalid `ead` or `pd`) fail before anything is scored. Everything else
//! degrades with a warning: absent optional components renormalize the
//! remaining weights, a category with no components at all takes its
//! configured fallback score.

use tracing::debug;

use crate::config::{CategorySpec, ComponentSpec, WeightConfig};
use crate::domain::{
    AuditTrail, Category, CategoryBreakdown, ComponentBreakdown, ComponentScore, Driver, FeatureVector,
    RiskReport, ScoreOverride,
};
use crate::error::{DegradedInputWarning, RiskError};
use crate::math::round_to;
use crate::models::PdEstimate;

const SCORE_DP: i32 = 1;
const PROB_DP: i32 = 6;
const MONEY_DP: i32 = 2;
/// Losses below this are float noise, not drivers.
const DRIVER_EPSILON: f64 = 1e-9;

/// Score one counterparty.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_risk(
    identity: &FeatureVector,
    financial: &FeatureVector,
    behavior: &FeatureVector,
    trade: &FeatureVector,
    esg: &FeatureVector,
    pd: &PdEstimate,
    ead: f64,
    config: &WeightConfig,
) -> Result<RiskReport, RiskError> {
    let slots = [
        (Category::Identity, identity),
        (Category::Financial, financial),
        (Category::Payment, behavior),
        (Category::Trade, trade),
        (Category::Esg, esg),
    ];
    validate_structure(&slots, pd, ead, config)?;

    let mut aggregator_warnings = Vec::new();
    let mut breakdowns = Vec::with_capacity(slots.len());
    let mut overall = 0.0;
    let mut data_confidence = 0.0;

    for (category, vector) in slots {
        let spec = config.category(category);
        let scored = score_category(category, vector, spec, config.explain_top_n, &mut aggregator_warnings);
        debug!(
            category = category.key(),
            sub_score = scored.sub_score,
            confidence = scored.confidence,
            "category scored"
        );
        overall += spec.weight * scored.sub_score;
        data_confidence += spec.weight * scored.confidence;
        breakdowns.push(scored.into_breakdown(spec.weight));
    }

    let overall_score = round_to(overall.clamp(0.0, 100.0), SCORE_DP);
    let risk_grade = config.grade_for(overall_score).to_string();

    let mitigation = match trade.get("loss_mitigation_factor") {
        Some(f) => f,
        None => {
            if !has_warning(trade, "trade.loss_mitigation_factor") {
                aggregator_warnings.push(DegradedInputWarning::new(
                    "lgd",
                    format!("loss_mitigation_factor absent; base LGD {} applies", config.lgd.base_lgd),
                ));
            }
            0.0
        }
    };
    let lgd = round_to((config.lgd.base_lgd * (1.0 - mitigation)).clamp(0.0, 1.0), PROB_DP);
    let pd_value = round_to(pd.pd, PROB_DP);
    let ead_value = round_to(ead, MONEY_DP);
    let expected_loss = round_to((pd_value * lgd * ead_value).clamp(0.0, ead_value), MONEY_DP).min(ead_value);

    let mut warnings: Vec<String> = slots
        .iter()
        .flat_map(|(_, v)| v.warnings().iter().map(ToString::to_string))
        .collect();
    warnings.extend(aggregator_warnings.iter().map(ToString::to_string));
    warnings.extend(pd.warning.iter().map(ToString::to_string));

    let mut parts = breakdowns.into_iter();
    let mut next = || parts.next().unwrap_or_else(empty_breakdown);
    let component_breakdown = ComponentBreakdown {
        identity: next(),
        financial: next(),
        payment: next(),
        trade: next(),
        esg: next(),
    };

    Ok(RiskReport {
        overall_score,
        risk_grade,
        pd: pd_value,
        lgd_estimate: lgd,
        expected_loss,
        ead: ead_value,
        component_breakdown,
        warnings,
        audit: AuditTrail {
            config_name: config.name.clone(),
            config_version: config.version.clone(),
            pd_model_version: pd.model_version.clone(),
            pd_source: pd.source,
            pd_low_confidence: pd.low_confidence,
            data_confidence: round_to(data_confidence, PROB_DP),
            base_score: overall_score,
            score_override: None,
        },
    })
}

/// Apply an analyst adjustment to a finished report.
///
/// The adjustment is always taken relative to `audit.base_score`, so applying
/// a second override replaces the first rather than stacking on it.
pub fn apply_override(
    mut report: RiskReport,
    adjustment: &ScoreOverride,
    config: &WeightConfig,
) -> Result<RiskReport, RiskError> {
    let max = config.max_override_delta;
    if !(adjustment.delta.is_finite() && adjustment.delta.abs() <= max) {
        return Err(RiskError::validation(
            "override.delta",
            format!("must be within ±{max}, got {}", adjustment.delta),
        ));
    }
    if adjustment.reason.trim().is_empty() {
        return Err(RiskError::validation("override.reason", "an override needs a reason"));
    }

    let base = report.audit.base_score;
    report.overall_score = round_to((base + adjustment.delta).clamp(0.0, 100.0), SCORE_DP);
    report.risk_grade = config.grade_for(report.overall_score).to_string();
    report.audit.score_override = Some(adjustment.clone());
    report.warnings.push(
        DegradedInputWarning::new(
            "override",
            format!(
                "analyst adjustment {:+} applied to base score {base} ({})",
                adjustment.delta,
                adjustment.reason.trim()
            ),
        )
        .to_string(),
    );
    Ok(report)
}

/// Whether the extractor already reported this field as degraded.
fn has_warning(vector: &FeatureVector, field: &str) -> bool {
    vector.warnings().iter().any(|w| w.field == field)
}

fn validate_structure(
    slots: &[(Category, &FeatureVector)],
    pd: &PdEstimate,
    ead: f64,
    config: &WeightConfig,
) -> Result<(), RiskError> {
    for (slot, vector) in slots {
        if vector.category() != *slot {
            return Err(RiskError::validation(
                slot.key(),
                format!("expected a {} feature vector, got {}", slot.key(), vector.category().key()),
            ));
        }
    }

    let mut missing = Vec::new();
    for (slot, vector) in slots {
        for component in &config.category(*slot).components {
            match vector.get(&component.feature) {
                Some(v) if !(0.0..=100.0).contains(&v) => {
                    return Err(RiskError::validation(
                        format!("{}.{}", slot.key(), component.feature),
                        format!("component score {v} outside [0, 100]"),
                    ));
                }
                Some(_) => {}
                None if component.required => missing.push(format!("{}.{}", slot.key(), component.feature)),
                None => {}
            }
        }
    }
    if !missing.is_empty() {
        return Err(RiskError::Validation {
            fields: missing,
            reason: "required component absent".to_string(),
        });
    }

    if !(ead.is_finite() && ead >= 0.0) {
        return Err(RiskError::validation("ead", format!("must be finite and >= 0, got {ead}")));
    }
    if !(pd.pd.is_finite() && (0.0..=1.0).contains(&pd.pd)) {
        return Err(RiskError::validation("pd", format!("must be in [0, 1], got {}", pd.pd)));
    }
    Ok(())
}

struct ScoredCategory {
    sub_score: f64,
    confidence: f64,
    components: Vec<ComponentScore>,
    drivers: Vec<Driver>,
}

impl ScoredCategory {
    fn into_breakdown(self, weight: f64) -> CategoryBreakdown {
        CategoryBreakdown {
            sub_score: round_to(self.sub_score, SCORE_DP),
            weight: round_to(weight, PROB_DP),
            contribution: round_to(weight * self.sub_score, SCORE_DP),
            confidence: round_to(self.confidence, PROB_DP),
            components: self.components,
            drivers: self.drivers,
        }
    }
}

fn score_category(
    category: Category,
    vector: &FeatureVector,
    spec: &CategorySpec,
    top_n: usize,
    warnings: &mut Vec<DegradedInputWarning>,
) -> ScoredCategory {
    let configured: f64 = spec.components.iter().map(|c| c.weight).sum();
    let mut present = Vec::new();
    for component in &spec.components {
        match vector.get(&component.feature) {
            Some(score) => present.push((component, score)),
            None => {
                let field = format!("{}.{}", category.key(), component.feature);
                if !has_warning(vector, &field) {
                    warnings.push(DegradedInputWarning::new(
                        field,
                        "optional component absent; remaining weights renormalized",
                    ));
                }
            }
        }
    }
    let present_weight: f64 = present.iter().map(|(c, _)| c.weight).sum();

    if present.is_empty() || present_weight <= 0.0 {
        warnings.push(DegradedInputWarning::new(
            category.key(),
            format!("no scored components; fallback score {} used", spec.fallback_score),
        ));
        return ScoredCategory {
            sub_score: spec.fallback_score,
            confidence: 0.0,
            components: Vec::new(),
            drivers: Vec::new(),
        };
    }

    let components: Vec<ComponentScore> = present
        .iter()
        .map(|(c, score)| ComponentScore {
            feature: c.feature.clone(),
            score: round_to(*score, SCORE_DP),
            weight: round_to(c.weight / present_weight, PROB_DP),
        })
        .collect();
    let sub_score = present
        .iter()
        .map(|(c, score)| c.weight / present_weight * score)
        .sum::<f64>()
        .clamp(0.0, 100.0);
    let confidence = if configured > 0.0 {
        (present_weight / configured).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let drivers = rank_drivers(vector, &present, present_weight, top_n);

    ScoredCategory {
        sub_score,
        confidence,
        components,
        drivers,
    }
}

/// Raw inputs ranked by the sub-score points they cost. An input's loss on
/// its component is scaled by the component's renormalized weight; a
/// component without recorded inputs stands in for itself. Inputs that cost
/// nothing are not drivers.
fn rank_drivers(
    vector: &FeatureVector,
    present: &[(&ComponentSpec, f64)],
    present_weight: f64,
    top_n: usize,
) -> Vec<Driver> {
    let mut lost: Vec<(&str, f64)> = Vec::new();
    for (component, score) in present {
        let share = component.weight / present_weight;
        let inputs: Vec<(&str, f64)> = match vector.feature(&component.feature) {
            Some(f) if !f.inputs.is_empty() => f
                .inputs
                .iter()
                .map(|i| (i.feature.as_str(), i.points_lost))
                .collect(),
            _ => vec![(component.feature.as_str(), 100.0 - score)],
        };
        for (input, points) in inputs {
            let points = share * points;
            match lost.iter_mut().find(|(name, _)| *name == input) {
                Some(entry) => entry.1 += points,
                None => lost.push((input, points)),
            }
        }
    }
    // Stable: ties keep component order, then input order.
    lost.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    lost.into_iter()
        .filter(|(_, points)| *points > DRIVER_EPSILON)
        .filter_map(|(input, points)| {
            vector.get(input).map(|value| Driver {
                feature: input.to_string(),
                value: round_to(value, PROB_DP),
                points_lost: round_to(points, SCORE_DP + 1),
            })
        })
        .take(top_n)
        .collect()
}

fn empty_breakdown() -> CategoryBreakdown {
    CategoryBreakdown {
        sub_score: 0.0,
        weight: 0.0,
        contribution: 0.0,
        confidence: 0.0,
        components: Vec::new(),
        drivers: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureDomain, PdSource};

    fn vector(category: Category, scores: &[(&str, f64)]) -> FeatureVector {
        let mut b = FeatureVector::builder(category);
        for (name, score) in scores {
            b.push_score(name, *score, &[]).unwrap();
        }
        b.build()
    }

    struct Bundle {
        identity: FeatureVector,
        financial: FeatureVector,
        payment: FeatureVector,
        trade: FeatureVector,
        esg: FeatureVector,
    }

    impl Bundle {
        fn uniform(score: f64, mitigation: Option<f64>) -> Self {
            let mut t = FeatureVector::builder(Category::Trade);
            t.push_score("execution_score", score, &[]).unwrap();
            if let Some(m) = mitigation {
                t.push("loss_mitigation_factor", m, FeatureDomain::Probability).unwrap();
            }
            Self {
                identity: vector(Category::Identity, &[("compliance_score", score)]),
                financial: vector(
                    Category::Financial,
                    &[
                        ("liquidity_score", score),
                        ("coverage_score", score),
                        ("profitability_score", score),
                        ("banking_score", score),
                    ],
                ),
                payment: vector(
                    Category::Payment,
                    &[("punctuality_score", score), ("delinquency_score", score)],
                ),
                trade: t.build(),
                esg: vector(Category::Esg, &[("sustainability_score", score)]),
            }
        }

        fn evaluate(&self, pd: f64, ead: f64, config: &WeightConfig) -> Result<RiskReport, RiskError> {
            let pd = PdEstimate::from_probability(pd, "test").unwrap();
            evaluate_risk(
                &self.identity,
                &self.financial,
                &self.payment,
                &self.trade,
                &self.esg,
                &pd,
                ead,
                config,
            )
        }
    }

    #[test]
    fn outputs_stay_in_bounds_over_a_grid() {
        let cfg = WeightConfig::default();
        for score in [0.0, 12.5, 50.0, 99.9, 100.0] {
            for mitigation in [None, Some(0.0), Some(0.648), Some(1.0)] {
                for pd in [0.0, 0.03, 0.5, 1.0] {
                    for ead in [0.0, 1.0, 150_000.0, 1e12] {
                        let r = Bundle::uniform(score, mitigation).evaluate(pd, ead, &cfg).unwrap();
                        assert!((0.0..=100.0).contains(&r.overall_score));
                        assert!((0.0..=1.0).contains(&r.pd));
                        assert!((0.0..=1.0).contains(&r.lgd_estimate));
                        assert!(r.expected_loss >= 0.0 && r.expected_loss <= r.ead);
                    }
                }
            }
        }
    }

    #[test]
    fn uniform_scores_give_that_score_overall() {
        let cfg = WeightConfig::default();
        let r = Bundle::uniform(80.0, Some(0.5)).evaluate(0.02, 1_000.0, &cfg).unwrap();
        assert_eq!(r.overall_score, 80.0);
        assert_eq!(r.risk_grade, "AA");
        assert!((r.lgd_estimate - 0.225).abs() < 1e-12);
        assert!((r.expected_loss - 4.5).abs() < 1e-9);
        assert_eq!(r.audit.data_confidence, 1.0);
    }

    #[test]
    fn serialized_reports_are_identical_across_runs() {
        let cfg = WeightConfig::default();
        let bundle = Bundle::uniform(67.3, Some(0.2));
        let a = serde_json::to_string(&bundle.evaluate(0.04, 150_000.0, &cfg).unwrap()).unwrap();
        let b = serde_json::to_string(&bundle.evaluate(0.04, 150_000.0, &cfg).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_required_components_are_all_named() {
        let cfg = WeightConfig::default();
        let mut bundle = Bundle::uniform(70.0, None);
        bundle.identity = vector(Category::Identity, &[]);
        bundle.payment = vector(Category::Payment, &[("punctuality_score", 70.0)]);
        let err = bundle.evaluate(0.01, 100.0, &cfg).unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["identity.compliance_score", "payment.delinquency_score"]
        );
    }

    #[test]
    fn missing_optional_component_renormalizes_with_warning() {
        let cfg = WeightConfig::default();
        let mut bundle = Bundle::uniform(90.0, Some(0.1));
        bundle.financial = vector(
            Category::Financial,
            &[("liquidity_score", 60.0), ("coverage_score", 80.0)],
        );
        let r = bundle.evaluate(0.01, 100.0, &cfg).unwrap();
        let fin = &r.component_breakdown.financial;
        // 0.35 / 0.70 each
        assert!((fin.sub_score - 70.0).abs() < 1e-9);
        assert!((fin.confidence - 0.7).abs() < 1e-9);
        assert_eq!(fin.components.len(), 2);
        assert!((fin.components[0].weight - 0.5).abs() < 1e-12);
        assert!(r.warnings.iter().any(|w| w.starts_with("financial.profitability_score:")));
        assert!(r.warnings.iter().any(|w| w.starts_with("financial.banking_score:")));
        assert!(r.audit.data_confidence < 1.0);
    }

    #[test]
    fn category_without_components_uses_fallback() {
        let mut cfg = WeightConfig::default();
        for c in &mut cfg.categories.esg.components {
            c.required = false;
        }
        let mut bundle = Bundle::uniform(90.0, Some(0.1));
        bundle.esg = vector(Category::Esg, &[]);
        let r = bundle.evaluate(0.01, 100.0, &cfg).unwrap();
        assert_eq!(r.component_breakdown.esg.sub_score, cfg.categories.esg.fallback_score);
        assert_eq!(r.component_breakdown.esg.confidence, 0.0);
        assert!(r.warnings.iter().any(|w| w.starts_with("esg:")));
    }

    #[test]
    fn vectors_in_the_wrong_slot_are_rejected() {
        let cfg = WeightConfig::default();
        let mut bundle = Bundle::uniform(50.0, None);
        std::mem::swap(&mut bundle.trade, &mut bundle.esg);
        let err = bundle.evaluate(0.01, 100.0, &cfg).unwrap_err();
        assert_eq!(err.fields(), vec!["trade"]);
    }

    #[test]
    fn invalid_ead_and_pd_are_rejected() {
        let cfg = WeightConfig::default();
        let bundle = Bundle::uniform(50.0, None);
        assert_eq!(bundle.evaluate(0.01, -1.0, &cfg).unwrap_err().fields(), vec!["ead"]);
        assert_eq!(bundle.evaluate(0.01, f64::NAN, &cfg).unwrap_err().fields(), vec!["ead"]);

        let bad_pd = PdEstimate {
            pd: 1.5,
            low_confidence: false,
            source: PdSource::Model,
            model_version: "x".to_string(),
            warning: None,
        };
        let err = evaluate_risk(
            &bundle.identity,
            &bundle.financial,
            &bundle.payment,
            &bundle.trade,
            &bundle.esg,
            &bad_pd,
            10.0,
            &cfg,
        )
        .unwrap_err();
        assert_eq!(err.fields(), vec!["pd"]);
    }

    #[test]
    fn absent_mitigation_uses_base_lgd_with_warning() {
        let cfg = WeightConfig::default();
        let r = Bundle::uniform(50.0, None).evaluate(0.1, 1_000.0, &cfg).unwrap();
        assert_eq!(r.lgd_estimate, cfg.lgd.base_lgd);
        assert!(r.warnings.last().unwrap().starts_with("lgd:"));
    }

    #[test]
    fn warnings_follow_category_then_aggregator_then_pd_order() {
        let cfg = WeightConfig::default();
        let mut bundle = Bundle::uniform(70.0, None);
        let mut e = FeatureVector::builder(Category::Esg);
        e.push_score("sustainability_score", 60.0, &[]).unwrap();
        e.warn("governance_transparent", "absent; treated as opaque");
        bundle.esg = e.build();
        let mut p = FeatureVector::builder(Category::Payment);
        p.push_score("punctuality_score", 50.0, &[]).unwrap();
        p.push_score("delinquency_score", 50.0, &[]).unwrap();
        p.warn("invoice_count", "thin");
        bundle.payment = p.build();

        let pd = PdEstimate {
            pd: 0.05,
            low_confidence: true,
            source: PdSource::Prior,
            model_version: "m".to_string(),
            warning: Some(DegradedInputWarning::new("pd", "prior used")),
        };
        let r = evaluate_risk(
            &bundle.identity,
            &bundle.financial,
            &bundle.payment,
            &bundle.trade,
            &bundle.esg,
            &pd,
            10.0,
            &cfg,
        )
        .unwrap();
        let fields: Vec<&str> = r.warnings.iter().map(|w| w.split(':').next().unwrap()).collect();
        assert_eq!(fields, vec!["payment.invoice_count", "esg.governance_transparent", "lgd", "pd"]);
        assert_eq!(r.audit.pd_source, PdSource::Prior);
        assert!(r.audit.pd_low_confidence);
    }

    #[test]
    fn drivers_follow_points_lost() {
        let mut cfg = WeightConfig::default();
        cfg.explain_top_n = 5;
        let mut bundle = Bundle::uniform(90.0, Some(0.1));
        let mut p = FeatureVector::builder(Category::Payment);
        p.push_count("max_dpd", 45).unwrap();
        p.push_count("dpd_1_30", 0).unwrap();
        p.push("late_fraction_amount", 0.1, FeatureDomain::Probability).unwrap();
        p.push("overdue_fraction_amount", 0.3, FeatureDomain::Probability).unwrap();
        p.push_score("punctuality_score", 95.0, &[("late_fraction_amount", 5.0)])
            .unwrap();
        p.push_score(
            "delinquency_score",
            40.0,
            &[("dpd_1_30", 0.0), ("max_dpd", 15.0), ("overdue_fraction_amount", 45.0)],
        )
        .unwrap();
        bundle.payment = p.build();
        let r = bundle.evaluate(0.01, 100.0, &cfg).unwrap();
        let drivers: Vec<(&str, f64)> = r
            .component_breakdown
            .payment
            .drivers
            .iter()
            .map(|d| (d.feature.as_str(), d.points_lost))
            .collect();
        // 0.4 × 45, 0.4 × 15, 0.6 × 5; the zero-cost bucket is left out.
        assert_eq!(
            drivers,
            vec![("overdue_fraction_amount", 18.0), ("max_dpd", 6.0), ("late_fraction_amount", 3.0)]
        );
    }

    #[test]
    fn perfect_category_has_no_drivers() {
        let cfg = WeightConfig::default();
        let r = Bundle::uniform(100.0, Some(0.1)).evaluate(0.01, 100.0, &cfg).unwrap();
        assert!(r.component_breakdown.identity.drivers.is_empty());
        assert_eq!(r.component_breakdown.trade.drivers.len(), 0);
    }

    #[test]
    fn extractor_warnings_are_not_repeated() {
        let cfg = WeightConfig::default();
        let mut bundle = Bundle::uniform(80.0, None);
        let mut f = FeatureVector::builder(Category::Financial);
        f.push_score("liquidity_score", 80.0, &[]).unwrap();
        f.warn("profitability_score", "revenue_ttm or cogs_ttm absent");
        bundle.financial = f.build();
        let mut t = FeatureVector::builder(Category::Trade);
        t.push_score("execution_score", 80.0, &[]).unwrap();
        t.warn("loss_mitigation_factor", "no insurance terms");
        bundle.trade = t.build();

        let r = bundle.evaluate(0.01, 100.0, &cfg).unwrap();
        let fields: Vec<&str> = r.warnings.iter().map(|w| w.split(':').next().unwrap()).collect();
        assert_eq!(
            fields,
            vec![
                "financial.profitability_score",
                "trade.loss_mitigation_factor",
                "financial.coverage_score",
                "financial.banking_score",
            ]
        );
        assert_eq!(r.lgd_estimate, cfg.lgd.base_lgd);
    }

    #[test]
    fn override_shifts_score_and_regrades() {
        let cfg = WeightConfig::default();
        let report = Bundle::uniform(78.0, Some(0.1)).evaluate(0.01, 100.0, &cfg).unwrap();
        assert_eq!(report.risk_grade, "A");

        let adj = ScoreOverride {
            delta: 4.0,
            reason: "parent guarantee on file".to_string(),
        };
        let r = apply_override(report, &adj, &cfg).unwrap();
        assert_eq!(r.overall_score, 82.0);
        assert_eq!(r.risk_grade, "AA");
        assert_eq!(r.audit.base_score, 78.0);
        assert_eq!(r.audit.score_override.as_ref(), Some(&adj));
        assert!(r.warnings.last().unwrap().starts_with("override:"));

        // A second override replaces, not stacks.
        let r = apply_override(r, &ScoreOverride { delta: -3.0, ..adj }, &cfg).unwrap();
        assert_eq!(r.overall_score, 75.0);
    }

    #[test]
    fn override_bounds_and_reason_are_enforced() {
        let cfg = WeightConfig::default();
        let report = Bundle::uniform(98.0, Some(0.1)).evaluate(0.01, 100.0, &cfg).unwrap();
        let too_big = ScoreOverride {
            delta: 10.5,
            reason: "x".to_string(),
        };
        assert_eq!(
            apply_override(report.clone(), &too_big, &cfg).unwrap_err().fields(),
            vec!["override.delta"]
        );
        let no_reason = ScoreOverride {
            delta: 1.0,
            reason: "  ".to_string(),
        };
        assert_eq!(
            apply_override(report.clone(), &no_reason, &cfg).unwrap_err().fields(),
            vec!["override.reason"]
        );

        let clamped = apply_override(
            report,
            &ScoreOverride {
                delta: 10.0,
                reason: "ok".to_string(),
            },
            &cfg,
        )
        .unwrap();
        assert_eq!(clamped.overall_score, 100.0);
    }
}
