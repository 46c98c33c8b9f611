//! Shared scoring pipeline used by every subcommand.
//!
//! counterparty -> five extractors (in parallel) -> PD (bounded) -> aggregate -> override
//!
//! The front-ends (`score`, `batch`) only decide where counterparties come
//! from and how results are printed.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::WeightConfig;
use crate::domain::{Counterparty, RiskReport};
use crate::error::RiskError;
use crate::features::{
    compute_esg_features, compute_financial_features, compute_identity_features, compute_payment_features,
    compute_trade_flow_features,
};
use crate::models::{LogisticPdModel, PdEstimator, PriorPdModel, check_pd_input, estimate_pd_with_timeout};
use crate::scoring::{apply_override, evaluate_risk};

/// Which PD estimator a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PdModelKind {
    Logistic,
    Prior,
}

pub fn build_pd_model(kind: PdModelKind, config: &WeightConfig) -> Arc<dyn PdEstimator> {
    match kind {
        PdModelKind::Logistic => Arc::new(LogisticPdModel::new(&config.pd.logistic)),
        PdModelKind::Prior => Arc::new(PriorPdModel::new(config.pd.prior_pd)),
    }
}

/// A scored counterparty.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub id: String,
    pub report: RiskReport,
}

/// Batch outcome: successes and failures, both in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub assessments: Vec<Assessment>,
    pub failures: Vec<(String, RiskError)>,
}

/// Score one counterparty.
pub fn assess(
    counterparty: &Counterparty,
    config: &WeightConfig,
    model: &Arc<dyn PdEstimator>,
) -> Result<RiskReport, RiskError> {
    let rules = &config.rules;
    let cp = counterparty;

    let ((identity, financial), ((payment, trade), esg)) = rayon::join(
        || {
            rayon::join(
                || compute_identity_features(&cp.identity.registry, &cp.identity.sanctions, &rules.identity),
                || compute_financial_features(&cp.financial.statement, &cp.financial.bank, &rules.financial),
            )
        },
        || {
            rayon::join(
                || {
                    rayon::join(
                        || compute_payment_features(&cp.invoices, cp.asof, &rules.payment),
                        || compute_trade_flow_features(&cp.trade.flow, cp.trade.insurance.as_ref(), &rules.trade),
                    )
                },
                || compute_esg_features(&cp.esg, &rules.esg),
            )
        },
    );
    // First error in category order, independent of scheduling.
    let identity = identity?;
    let financial = financial?;
    let payment = payment?;
    let trade = trade?;
    let esg = esg?;

    check_pd_input(&payment)?;
    let pd = estimate_pd_with_timeout(Arc::clone(model), &payment, &config.pd);

    let mut report = evaluate_risk(&identity, &financial, &payment, &trade, &esg, &pd, cp.ead, config)?;
    if let Some(adjustment) = &cp.score_override {
        report = apply_override(report, adjustment, config)?;
    }

    for w in &report.warnings {
        warn!(counterparty = %cp.id, "{w}");
    }
    info!(
        counterparty = %cp.id,
        score = report.overall_score,
        grade = %report.risk_grade,
        pd = report.pd,
        expected_loss = report.expected_loss,
        "counterparty scored"
    );
    Ok(report)
}

/// Score many counterparties in parallel. Output order follows input order.
pub fn assess_batch(
    counterparties: &[Counterparty],
    config: &WeightConfig,
    model: &Arc<dyn PdEstimator>,
) -> BatchOutput {
    let results: Vec<(String, Result<RiskReport, RiskError>)> = counterparties
        .par_iter()
        .map(|cp| (cp.id.clone(), assess(cp, config, model)))
        .collect();

    let mut out = BatchOutput::default();
    for (id, result) in results {
        match result {
            Ok(report) => out.assessments.push(Assessment { id, report }),
            Err(e) => {
                warn!(counterparty = %id, error = %e, "counterparty rejected");
                out.failures.push((id, e));
            }
        }
    }
    out
}
