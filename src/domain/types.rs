//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - deserialized from counterparty files handed over by upstream collaborators
//! - passed between extractors, the PD estimator and the aggregator
//! - exported as JSON reports

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DegradedInputWarning, RiskError};

/// Sub-score category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Identity,
    Financial,
    Payment,
    Trade,
    Esg,
}

impl Category {
    /// Fixed evaluation/reporting order.
    pub const ALL: [Category; 5] = [
        Category::Identity,
        Category::Financial,
        Category::Payment,
        Category::Trade,
        Category::Esg,
    ];

    /// Short key used in field paths (`financial.current_liabilities`).
    pub fn key(self) -> &'static str {
        match self {
            Category::Identity => "identity",
            Category::Financial => "financial",
            Category::Payment => "payment",
            Category::Trade => "trade",
            Category::Esg => "esg",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Category::Identity => "Identity & Integrity",
            Category::Financial => "Financial Health",
            Category::Payment => "Payment Behavior",
            Category::Trade => "Trade Flow",
            Category::Esg => "ESG",
        }
    }
}

/// Declared value domain of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureDomain {
    /// Any finite value (ratios with a possibly negative numerator).
    Real,
    /// Finite and `>= 0`.
    NonNegative,
    /// In `[0, 1]`.
    Probability,
    /// Whole number `>= 0`.
    Count,
    /// Boolean encoded as `0` or `1`.
    Flag,
    /// Normalized sub-score in `[0, 100]`.
    Score,
}

impl FeatureDomain {
    pub fn contains(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            FeatureDomain::Real => true,
            FeatureDomain::NonNegative => value >= 0.0,
            FeatureDomain::Probability => (0.0..=1.0).contains(&value),
            FeatureDomain::Count => value >= 0.0 && value.fract() == 0.0,
            FeatureDomain::Flag => value == 0.0 || value == 1.0,
            FeatureDomain::Score => (0.0..=100.0).contains(&value),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeatureDomain::Real => "real",
            FeatureDomain::NonNegative => "non-negative",
            FeatureDomain::Probability => "probability",
            FeatureDomain::Count => "count",
            FeatureDomain::Flag => "flag",
            FeatureDomain::Score => "score",
        }
    }
}

/// One named value in a [`FeatureVector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub value: f64,
    pub domain: FeatureDomain,
    /// Raw features a derived score was computed from (empty for raw features).
    pub inputs: Vec<InputImpact>,
}

/// Points (on the derived score's 0-100 scale) one raw input cost that score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputImpact {
    pub feature: String,
    pub points_lost: f64,
}

/// Ordered, immutable feature mapping produced by one extractor call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    category: Category,
    features: Vec<Feature>,
    warnings: Vec<DegradedInputWarning>,
}

impl FeatureVector {
    pub fn builder(category: Category) -> FeatureVectorBuilder {
        FeatureVectorBuilder {
            category,
            features: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.feature(name).map(|f| f.value)
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.feature(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Degraded-input warnings raised while extracting this vector.
    pub fn warnings(&self) -> &[DegradedInputWarning] {
        &self.warnings
    }
}

/// Accumulates features in insertion order and validates their domains.
#[derive(Debug)]
pub struct FeatureVectorBuilder {
    category: Category,
    features: Vec<Feature>,
    warnings: Vec<DegradedInputWarning>,
}

impl FeatureVectorBuilder {
    pub fn push(&mut self, name: &str, value: f64, domain: FeatureDomain) -> Result<(), RiskError> {
        self.push_with_inputs(name, value, domain, &[])
    }

    pub fn push_flag(&mut self, name: &str, value: bool) -> Result<(), RiskError> {
        self.push(name, if value { 1.0 } else { 0.0 }, FeatureDomain::Flag)
    }

    pub fn push_count(&mut self, name: &str, value: u32) -> Result<(), RiskError> {
        self.push(name, f64::from(value), FeatureDomain::Count)
    }

    /// Push a derived `[0, 100]` score together with the raw features behind it
    /// and how many points each of them cost.
    pub fn push_score(&mut self, name: &str, value: f64, inputs: &[(&str, f64)]) -> Result<(), RiskError> {
        self.push_with_inputs(name, value, FeatureDomain::Score, inputs)
    }

    fn push_with_inputs(
        &mut self,
        name: &str,
        value: f64,
        domain: FeatureDomain,
        inputs: &[(&str, f64)],
    ) -> Result<(), RiskError> {
        let path = format!("{}.{name}", self.category.key());
        if self.features.iter().any(|f| f.name == name) {
            return Err(RiskError::validation(path, "duplicate feature name"));
        }
        if !domain.contains(value) {
            return Err(RiskError::validation(
                path,
                format!("value {value} outside {} domain", domain.label()),
            ));
        }
        self.features.push(Feature {
            name: name.to_string(),
            value,
            domain,
            inputs: inputs
                .iter()
                .map(|(feature, lost)| InputImpact {
                    feature: feature.to_string(),
                    points_lost: lost.max(0.0),
                })
                .collect(),
        });
        Ok(())
    }

    pub fn warn(&mut self, field: &str, message: impl Into<String>) {
        let path = format!("{}.{field}", self.category.key());
        self.warnings.push(DegradedInputWarning::new(path, message));
    }

    pub fn build(self) -> FeatureVector {
        FeatureVector {
            category: self.category,
            features: self.features,
            warnings: self.warnings,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw input records (already structured by upstream collaborators)
// ---------------------------------------------------------------------------

/// Registry / KYB verification flags. Every field is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryFlags {
    pub lei_valid: Option<bool>,
    pub vat_valid: Option<bool>,
    pub eori_valid: Option<bool>,
    pub kyb_passed: Option<bool>,
}

/// Sanctions-screening results. Every field is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanctionsScreen {
    pub sanctions_hits: Option<u32>,
    pub pep: Option<bool>,
    pub adverse_media_count: Option<u32>,
}

/// Financial-statement snapshot (monetary figures, may be negative).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialStatement {
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub cash: Option<f64>,
    pub ar: Option<f64>,
    pub debt_service: Option<f64>,
    pub ebitda: Option<f64>,
    pub interest_expense: Option<f64>,
    pub revenue_ttm: Option<f64>,
    pub cogs_ttm: Option<f64>,
}

/// Bank-activity summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankStats {
    pub returned_count: Option<u32>,
    pub tx_out_count: Option<u32>,
    pub cash_buffer_days: Option<u32>,
}

/// One ledger invoice. `paid_date = None` means still outstanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
    pub amount: f64,
}

/// Shipment status (closed enumeration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipmentStatus {
    Pending,
    InTransit,
    Delivered,
    Disputed,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 4] = [
        ShipmentStatus::Pending,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delivered,
        ShipmentStatus::Disputed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "Pending",
            ShipmentStatus::InTransit => "InTransit",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::Disputed => "Disputed",
        }
    }
}

impl FromStr for ShipmentStatus {
    type Err = RiskError;

    /// Case-insensitive; `in_transit`, `in-transit` and `In Transit` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "pending" => Ok(ShipmentStatus::Pending),
            "intransit" => Ok(ShipmentStatus::InTransit),
            "delivered" => Ok(ShipmentStatus::Delivered),
            "disputed" => Ok(ShipmentStatus::Disputed),
            _ => Err(RiskError::validation(
                "trade.status",
                format!("unrecognized shipment status '{s}'"),
            )),
        }
    }
}

/// Delivery state of the financed trade. Every field is required.
///
/// `status` stays a string here so that unknown labels surface as a
/// validation error naming the field rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeFlow {
    pub delivered: Option<bool>,
    pub status: Option<String>,
    pub loss_ratio: Option<f64>,
}

/// Trade-credit-insurance terms, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceTerms {
    pub insured_ratio: f64,
    pub payout_prob: f64,
    pub deductible_ratio: f64,
}

/// ESG questionnaire answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsgProfile {
    pub certifications: Vec<String>,
    pub controversy_count: Option<u32>,
    pub governance_transparent: Option<bool>,
}

/// Analyst adjustment applied on top of the model score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOverride {
    pub delta: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityRecord {
    pub registry: RegistryFlags,
    pub sanctions: SanctionsScreen,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialRecord {
    pub statement: FinancialStatement,
    pub bank: BankStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeRecord {
    pub flow: TradeFlow,
    pub insurance: Option<InsuranceTerms>,
}

/// Everything known about one counterparty at an evaluation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: String,
    pub asof: NaiveDate,
    /// Exposure at default (monetary).
    pub ead: f64,
    #[serde(default)]
    pub identity: IdentityRecord,
    #[serde(default)]
    pub financial: FinancialRecord,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub trade: TradeRecord,
    #[serde(default)]
    pub esg: EsgProfile,
    #[serde(default, rename = "override")]
    pub score_override: Option<ScoreOverride>,
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A configured component score as it entered its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub feature: String,
    pub score: f64,
    /// Weight after renormalization over the components present.
    pub weight: f64,
}

/// A raw input feature that drove a category score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub feature: String,
    pub value: f64,
    /// Points of the category sub-score this input cost.
    pub points_lost: f64,
}

/// Per-category explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub sub_score: f64,
    pub weight: f64,
    /// Points contributed to the overall score (`weight × sub_score`).
    pub contribution: f64,
    /// Share of configured component weight backed by real data.
    pub confidence: f64,
    pub components: Vec<ComponentScore>,
    pub drivers: Vec<Driver>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub identity: CategoryBreakdown,
    pub financial: CategoryBreakdown,
    pub payment: CategoryBreakdown,
    pub trade: CategoryBreakdown,
    pub esg: CategoryBreakdown,
}

impl ComponentBreakdown {
    pub fn get(&self, category: Category) -> &CategoryBreakdown {
        match category {
            Category::Identity => &self.identity,
            Category::Financial => &self.financial,
            Category::Payment => &self.payment,
            Category::Trade => &self.trade,
            Category::Esg => &self.esg,
        }
    }
}

/// Where the PD in a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdSource {
    /// The configured model produced it.
    Model,
    /// Insufficient history; configured prior used.
    Prior,
    /// Model failed or timed out; configured prior used.
    Fallback,
    /// Supplied directly by the caller.
    Supplied,
}

impl PdSource {
    pub fn label(self) -> &'static str {
        match self {
            PdSource::Model => "model",
            PdSource::Prior => "prior",
            PdSource::Fallback => "fallback",
            PdSource::Supplied => "supplied",
        }
    }
}

/// Audit metadata: what produced this report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub config_name: String,
    pub config_version: String,
    pub pd_model_version: String,
    pub pd_source: PdSource,
    pub pd_low_confidence: bool,
    /// Weight-averaged category confidence in `[0, 1]`.
    pub data_confidence: f64,
    /// Model score before any analyst override.
    pub base_score: f64,
    #[serde(rename = "override")]
    pub score_override: Option<ScoreOverride>,
}

/// Final, immutable risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub overall_score: f64,
    pub risk_grade: String,
    pub pd: f64,
    pub lgd_estimate: f64,
    pub expected_loss: f64,
    pub ead: f64,
    pub component_breakdown: ComponentBreakdown,
    pub warnings: Vec<String>,
    pub audit: AuditTrail,
}
