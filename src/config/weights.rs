//! Versioned weighting policy.
//!
//! A `WeightConfig` is the single source of every number the engine uses:
//! category weights, per-feature normalisation rules, grade bands, the base
//! LGD and the PD fallback policy. It is never mutated at runtime; every
//! evaluation receives an explicit reference, so a past decision can be
//! reproduced from the (inputs, config) pair alone.
//!
//! `WeightConfig::default()` is a demo table (`rift-default` 1.0.0), not a
//! calibrated policy for any jurisdiction.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Category, ShipmentStatus};
use crate::error::RiskError;
use crate::math::{Direction, LookupTable, NormalizationRule};

/// One scored feature inside a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub feature: String,
    pub weight: f64,
    /// Missing required components fail the evaluation; missing optional ones degrade it.
    #[serde(default)]
    pub required: bool,
}

impl ComponentSpec {
    fn new(feature: &str, weight: f64, required: bool) -> Self {
        Self {
            feature: feature.to_string(),
            weight,
            required,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub weight: f64,
    /// Sub-score used when none of the components is present.
    pub fallback_score: f64,
    pub components: Vec<ComponentSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    pub identity: CategorySpec,
    pub financial: CategorySpec,
    pub payment: CategorySpec,
    pub trade: CategorySpec,
    pub esg: CategorySpec,
}

/// Grade band: scores `>= min_score` (and below the previous band) get `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub label: String,
    pub min_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRules {
    pub lei_weight: f64,
    pub vat_weight: f64,
    pub eori_weight: f64,
    pub kyb_weight: f64,
    /// Multiplier applied once per sanctions hit.
    pub sanctions_decay: f64,
    pub pep_factor: f64,
    /// Multiplier applied once per adverse-media mention, up to `adverse_media_cap` mentions.
    pub adverse_media_decay: f64,
    pub adverse_media_cap: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRules {
    pub current_ratio: NormalizationRule,
    pub quick_ratio: NormalizationRule,
    pub dscr: NormalizationRule,
    pub interest_coverage: NormalizationRule,
    pub gross_margin: NormalizationRule,
    pub returned_item_rate: NormalizationRule,
    pub cash_buffer_days: NormalizationRule,
}

/// Penalty points (out of 100) for an overdue invoice in each DPD bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpdPenalties {
    pub dpd_1_30: f64,
    pub dpd_31_60: f64,
    pub dpd_61_90: f64,
    pub dpd_90_plus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRules {
    /// Below this many invoices both payment scores use the fallback.
    pub min_invoice_count: u32,
    pub insufficient_history_score: f64,
    /// Punctuality multiplier: `1 - late_penalty × late_fraction_amount`.
    pub late_penalty: f64,
    /// Maps amount-weighted days late to a score.
    pub days_late: NormalizationRule,
    pub dpd_penalties: DpdPenalties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRules {
    /// Weight of the status score vs the loss-ratio score.
    pub status_weight: f64,
    /// Multiplier when the delivery has not completed.
    pub undelivered_factor: f64,
    pub status_scores: LookupTable,
    pub loss_ratio: NormalizationRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgRules {
    pub base_score: f64,
    pub per_certification_cap: f64,
    pub total_certification_cap: f64,
    /// Penalty for the first controversy; each further one costs `controversy_decay` times the previous.
    pub controversy_penalty: f64,
    pub controversy_decay: f64,
    /// Ceiling applied when governance is not transparent.
    pub opaque_cap: f64,
    pub certifications: LookupTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub identity: IdentityRules,
    pub financial: FinancialRules,
    pub payment: PaymentRules,
    pub trade: TradeRules,
    pub esg: EsgRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LgdPolicy {
    pub base_lgd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdPolicy {
    /// Fewer invoices than this → prior PD, flagged low-confidence.
    pub min_invoice_count: u32,
    pub prior_pd: f64,
    /// Upper bound on a single PD inference; `0` disables the bound.
    pub timeout_ms: u64,
    /// Timed-out PD threads allowed to linger before the model is skipped.
    #[serde(default = "default_max_stalled_workers")]
    pub max_stalled_workers: usize,
    pub logistic: LogisticSpec,
}

fn default_max_stalled_workers() -> usize {
    32
}

/// Coefficients of the logistic PD model over payment features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticSpec {
    pub version: String,
    pub intercept: f64,
    pub coefficients: Vec<Coefficient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub feature: String,
    pub weight: f64,
}

impl Coefficient {
    fn new(feature: &str, weight: f64) -> Self {
        Self {
            feature: feature.to_string(),
            weight,
        }
    }
}

/// Named, versioned weighting policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    pub name: String,
    pub version: String,
    /// Allowed deviation of weight sums from 1.0.
    pub weight_tolerance: f64,
    /// Number of raw drivers listed per category in the breakdown.
    pub explain_top_n: usize,
    /// Largest accepted analyst override, in score points.
    pub max_override_delta: f64,
    pub lgd: LgdPolicy,
    pub pd: PdPolicy,
    pub categories: CategoryTable,
    /// Ordered by descending `min_score`; the last band must start at 0.
    pub grades: Vec<GradeBand>,
    pub rules: RuleSet,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            name: "rift-default".to_string(),
            version: "1.0.0".to_string(),
            weight_tolerance: 1e-6,
            explain_top_n: 3,
            max_override_delta: 10.0,
            lgd: LgdPolicy { base_lgd: 0.45 },
            pd: PdPolicy {
                min_invoice_count: 3,
                prior_pd: 0.05,
                timeout_ms: 250,
                max_stalled_workers: default_max_stalled_workers(),
                logistic: LogisticSpec {
                    version: "logit-pay-0.3".to_string(),
                    intercept: -4.5,
                    coefficients: vec![
                        Coefficient::new("late_fraction_amount", 2.0),
                        Coefficient::new("weighted_days_late", 0.04),
                        Coefficient::new("overdue_fraction_amount", 3.0),
                        Coefficient::new("max_dpd", 0.02),
                    ],
                },
            },
            categories: CategoryTable {
                identity: CategorySpec {
                    weight: 0.10,
                    fallback_score: 50.0,
                    components: vec![ComponentSpec::new("compliance_score", 1.0, true)],
                },
                financial: CategorySpec {
                    weight: 0.20,
                    fallback_score: 50.0,
                    components: vec![
                        ComponentSpec::new("liquidity_score", 0.35, true),
                        ComponentSpec::new("coverage_score", 0.35, false),
                        ComponentSpec::new("profitability_score", 0.15, false),
                        ComponentSpec::new("banking_score", 0.15, false),
                    ],
                },
                payment: CategorySpec {
                    weight: 0.30,
                    fallback_score: 50.0,
                    components: vec![
                        ComponentSpec::new("punctuality_score", 0.6, true),
                        ComponentSpec::new("delinquency_score", 0.4, true),
                    ],
                },
                trade: CategorySpec {
                    weight: 0.20,
                    fallback_score: 50.0,
                    components: vec![ComponentSpec::new("execution_score", 1.0, true)],
                },
                esg: CategorySpec {
                    weight: 0.20,
                    fallback_score: 50.0,
                    components: vec![ComponentSpec::new("sustainability_score", 1.0, true)],
                },
            },
            grades: [
                ("AAA", 90.0),
                ("AA", 80.0),
                ("A", 70.0),
                ("BBB", 60.0),
                ("BB", 50.0),
                ("B", 40.0),
                ("D", 0.0),
            ]
            .iter()
            .map(|&(label, min_score)| GradeBand {
                label: label.to_string(),
                min_score,
            })
            .collect(),
            rules: RuleSet {
                identity: IdentityRules {
                    lei_weight: 0.2,
                    vat_weight: 0.2,
                    eori_weight: 0.1,
                    kyb_weight: 0.5,
                    sanctions_decay: 0.05,
                    pep_factor: 0.75,
                    adverse_media_decay: 0.9,
                    adverse_media_cap: 5,
                },
                financial: FinancialRules {
                    current_ratio: NormalizationRule::bands(
                        Direction::HigherIsBetter,
                        &[(2.0, 100.0), (1.5, 85.0), (1.2, 70.0), (1.0, 50.0)],
                        20.0,
                    ),
                    quick_ratio: NormalizationRule::bands(
                        Direction::HigherIsBetter,
                        &[(1.5, 100.0), (1.0, 80.0), (0.7, 55.0)],
                        25.0,
                    ),
                    dscr: NormalizationRule::bands(
                        Direction::HigherIsBetter,
                        &[(1.5, 100.0), (1.25, 75.0), (1.0, 50.0)],
                        0.0,
                    ),
                    interest_coverage: NormalizationRule::bands(
                        Direction::HigherIsBetter,
                        &[(5.0, 100.0), (3.0, 80.0), (1.5, 50.0)],
                        10.0,
                    ),
                    gross_margin: NormalizationRule::linear(0.0, 0.5, 0.0, 100.0),
                    returned_item_rate: NormalizationRule::bands(
                        Direction::LowerIsBetter,
                        &[(0.0, 100.0), (0.01, 85.0), (0.03, 60.0), (0.05, 35.0)],
                        10.0,
                    ),
                    cash_buffer_days: NormalizationRule::linear(0.0, 60.0, 0.0, 100.0),
                },
                payment: PaymentRules {
                    min_invoice_count: 1,
                    insufficient_history_score: 50.0,
                    late_penalty: 0.5,
                    days_late: NormalizationRule::linear(0.0, 60.0, 100.0, 0.0),
                    dpd_penalties: DpdPenalties {
                        dpd_1_30: 25.0,
                        dpd_31_60: 50.0,
                        dpd_61_90: 75.0,
                        dpd_90_plus: 100.0,
                    },
                },
                trade: TradeRules {
                    status_weight: 0.6,
                    undelivered_factor: 0.9,
                    status_scores: LookupTable::new(
                        &[
                            ("Delivered", 100.0),
                            ("InTransit", 75.0),
                            ("Pending", 60.0),
                            ("Disputed", 15.0),
                        ],
                        None,
                    ),
                    loss_ratio: NormalizationRule::linear(0.0, 0.5, 100.0, 0.0),
                },
                esg: EsgRules {
                    base_score: 75.0,
                    per_certification_cap: 20.0,
                    total_certification_cap: 25.0,
                    controversy_penalty: 15.0,
                    controversy_decay: 0.5,
                    opaque_cap: 60.0,
                    certifications: LookupTable::new(
                        &[
                            ("ISO14001", 20.0),
                            ("ISO45001", 15.0),
                            ("ISO50001", 15.0),
                            ("SA8000", 15.0),
                            ("BCORP", 25.0),
                            ("ECOVADIS", 20.0),
                            ("EMAS", 20.0),
                            ("FSC", 10.0),
                            ("FAIRTRADE", 10.0),
                        ],
                        None,
                    ),
                },
            },
        }
    }
}

impl WeightConfig {
    pub fn category(&self, category: Category) -> &CategorySpec {
        match category {
            Category::Identity => &self.categories.identity,
            Category::Financial => &self.categories.financial,
            Category::Payment => &self.categories.payment,
            Category::Trade => &self.categories.trade,
            Category::Esg => &self.categories.esg,
        }
    }

    /// Grade label for a score. Assumes a validated config.
    pub fn grade_for(&self, score: f64) -> &str {
        self.grades
            .iter()
            .find(|g| score >= g.min_score)
            .or(self.grades.last())
            .map(|g| g.label.as_str())
            .unwrap_or("")
    }

    /// Check every invariant the engine relies on, naming the offending field.
    pub fn validate(&self) -> Result<(), RiskError> {
        if self.name.trim().is_empty() {
            return Err(RiskError::config("name", "must not be empty"));
        }
        if self.version.trim().is_empty() {
            return Err(RiskError::config("version", "must not be empty"));
        }
        let tol = self.weight_tolerance;
        if !(tol.is_finite() && tol >= 0.0 && tol < 0.1) {
            return Err(RiskError::config("weight_tolerance", format!("must be in [0, 0.1), got {tol}")));
        }

        let mut sum = 0.0;
        for category in Category::ALL {
            let spec = self.category(category);
            let path = format!("categories.{}", category.key());
            check_weight(&format!("{path}.weight"), spec.weight)?;
            check_unit_score(&format!("{path}.fallback_score"), spec.fallback_score)?;
            sum += spec.weight;

            if spec.components.is_empty() {
                return Err(RiskError::config(format!("{path}.components"), "must not be empty"));
            }
            let mut component_sum = 0.0;
            for (i, c) in spec.components.iter().enumerate() {
                check_weight(&format!("{path}.components[{i}].weight"), c.weight)?;
                if spec.components[..i].iter().any(|o| o.feature == c.feature) {
                    return Err(RiskError::config(
                        format!("{path}.components[{i}].feature"),
                        format!("duplicate component '{}'", c.feature),
                    ));
                }
                component_sum += c.weight;
            }
            if (component_sum - 1.0).abs() > tol {
                return Err(RiskError::config(
                    format!("{path}.components"),
                    format!("component weights sum to {component_sum}, expected 1.0 ± {tol}"),
                ));
            }
        }
        if (sum - 1.0).abs() > tol {
            return Err(RiskError::config(
                "categories",
                format!("category weights sum to {sum}, expected 1.0 ± {tol}"),
            ));
        }

        self.validate_grades()?;
        self.validate_rules()?;

        check_probability("lgd.base_lgd", self.lgd.base_lgd)?;
        check_probability("pd.prior_pd", self.pd.prior_pd)?;
        self.validate_logistic()?;
        if !(self.max_override_delta.is_finite() && (0.0..=100.0).contains(&self.max_override_delta)) {
            return Err(RiskError::config("max_override_delta", "must be in [0, 100]"));
        }
        Ok(())
    }

    fn validate_logistic(&self) -> Result<(), RiskError> {
        let spec = &self.pd.logistic;
        if spec.version.trim().is_empty() {
            return Err(RiskError::config("pd.logistic.version", "must not be empty"));
        }
        if !spec.intercept.is_finite() {
            return Err(RiskError::config("pd.logistic.intercept", "must be finite"));
        }
        for (i, c) in spec.coefficients.iter().enumerate() {
            if !c.weight.is_finite() {
                return Err(RiskError::config(format!("pd.logistic.coefficients[{i}].weight"), "must be finite"));
            }
            if spec.coefficients[..i].iter().any(|o| o.feature == c.feature) {
                return Err(RiskError::config(
                    format!("pd.logistic.coefficients[{i}].feature"),
                    format!("duplicate coefficient '{}'", c.feature),
                ));
            }
        }
        Ok(())
    }

    fn validate_grades(&self) -> Result<(), RiskError> {
        if self.grades.is_empty() {
            return Err(RiskError::config("grades", "must not be empty"));
        }
        for (i, g) in self.grades.iter().enumerate() {
            if g.label.trim().is_empty() {
                return Err(RiskError::config(format!("grades[{i}].label"), "must not be empty"));
            }
            check_unit_score(&format!("grades[{i}].min_score"), g.min_score)?;
            if self.grades[..i].iter().any(|o| o.label == g.label) {
                return Err(RiskError::config(format!("grades[{i}].label"), format!("duplicate grade '{}'", g.label)));
            }
            if i > 0 && g.min_score >= self.grades[i - 1].min_score {
                return Err(RiskError::config(
                    format!("grades[{i}].min_score"),
                    "bands must be ordered by strictly descending min_score",
                ));
            }
        }
        let last = &self.grades[self.grades.len() - 1];
        if last.min_score != 0.0 {
            return Err(RiskError::config(
                format!("grades[{}].min_score", self.grades.len() - 1),
                "lowest band must start at 0 so the bands are exhaustive",
            ));
        }
        Ok(())
    }

    fn validate_rules(&self) -> Result<(), RiskError> {
        let id = &self.rules.identity;
        for (field, w) in [
            ("rules.identity.lei_weight", id.lei_weight),
            ("rules.identity.vat_weight", id.vat_weight),
            ("rules.identity.eori_weight", id.eori_weight),
            ("rules.identity.kyb_weight", id.kyb_weight),
        ] {
            check_weight(field, w)?;
        }
        if id.lei_weight + id.vat_weight + id.eori_weight + id.kyb_weight <= 0.0 {
            return Err(RiskError::config("rules.identity", "flag weights must not all be zero"));
        }
        check_probability("rules.identity.sanctions_decay", id.sanctions_decay)?;
        check_probability("rules.identity.pep_factor", id.pep_factor)?;
        check_probability("rules.identity.adverse_media_decay", id.adverse_media_decay)?;

        let fin = &self.rules.financial;
        fin.current_ratio.validate("rules.financial.current_ratio")?;
        fin.quick_ratio.validate("rules.financial.quick_ratio")?;
        fin.dscr.validate("rules.financial.dscr")?;
        fin.interest_coverage.validate("rules.financial.interest_coverage")?;
        fin.gross_margin.validate("rules.financial.gross_margin")?;
        fin.returned_item_rate.validate("rules.financial.returned_item_rate")?;
        fin.cash_buffer_days.validate("rules.financial.cash_buffer_days")?;

        let pay = &self.rules.payment;
        check_unit_score("rules.payment.insufficient_history_score", pay.insufficient_history_score)?;
        check_probability("rules.payment.late_penalty", pay.late_penalty)?;
        pay.days_late.validate("rules.payment.days_late")?;
        for (field, p) in [
            ("rules.payment.dpd_penalties.dpd_1_30", pay.dpd_penalties.dpd_1_30),
            ("rules.payment.dpd_penalties.dpd_31_60", pay.dpd_penalties.dpd_31_60),
            ("rules.payment.dpd_penalties.dpd_61_90", pay.dpd_penalties.dpd_61_90),
            ("rules.payment.dpd_penalties.dpd_90_plus", pay.dpd_penalties.dpd_90_plus),
        ] {
            check_unit_score(field, p)?;
        }

        let trade = &self.rules.trade;
        check_probability("rules.trade.status_weight", trade.status_weight)?;
        check_probability("rules.trade.undelivered_factor", trade.undelivered_factor)?;
        trade.status_scores.validate("rules.trade.status_scores")?;
        trade.loss_ratio.validate("rules.trade.loss_ratio")?;
        for status in ShipmentStatus::ALL {
            if trade.status_scores.score(status.label()).is_none() {
                return Err(RiskError::config(
                    "rules.trade.status_scores",
                    format!("no score for status '{}'", status.label()),
                ));
            }
        }

        let esg = &self.rules.esg;
        check_unit_score("rules.esg.base_score", esg.base_score)?;
        check_unit_score("rules.esg.per_certification_cap", esg.per_certification_cap)?;
        check_unit_score("rules.esg.total_certification_cap", esg.total_certification_cap)?;
        check_unit_score("rules.esg.controversy_penalty", esg.controversy_penalty)?;
        check_unit_score("rules.esg.opaque_cap", esg.opaque_cap)?;
        if !(esg.controversy_decay.is_finite() && (0.0..1.0).contains(&esg.controversy_decay)) {
            return Err(RiskError::config("rules.esg.controversy_decay", "must be in [0, 1)"));
        }
        esg.certifications.validate("rules.esg.certifications")?;
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RiskError> {
        let config: WeightConfig =
            toml::from_str(text).map_err(|e| RiskError::config("<toml>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, RiskError> {
        let config: WeightConfig =
            serde_json::from_str(text).map_err(|e| RiskError::config("<json>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a `.toml` or `.json` weight file.
    pub fn from_path(path: &Path) -> Result<Self, RiskError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RiskError::config(path.display().to_string(), format!("cannot read: {e}")))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    pub fn to_toml_string(&self) -> Result<String, RiskError> {
        toml::to_string_pretty(self).map_err(|e| RiskError::config("<toml>", e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, RiskError> {
        serde_json::to_string_pretty(self).map_err(|e| RiskError::config("<json>", e.to_string()))
    }
}

fn check_weight(field: &str, w: f64) -> Result<(), RiskError> {
    if !(w.is_finite() && w >= 0.0) {
        return Err(RiskError::config(field, format!("weight must be finite and >= 0, got {w}")));
    }
    Ok(())
}

fn check_probability(field: &str, p: f64) -> Result<(), RiskError> {
    if !(p.is_finite() && (0.0..=1.0).contains(&p)) {
        return Err(RiskError::config(field, format!("must be in [0, 1], got {p}")));
    }
    Ok(())
}

fn check_unit_score(field: &str, s: f64) -> Result<(), RiskError> {
    if !(s.is_finite() && (0.0..=100.0).contains(&s)) {
        return Err(RiskError::config(field, format!("must be in [0, 100], got {s}")));
    }
    Ok(())
}
