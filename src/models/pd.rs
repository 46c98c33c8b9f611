//! Probability-of-default estimation.
//!
//! The aggregator only ever sees a [`PdEstimate`] value. How it was produced
//! is a replaceable strategy behind [`PdEstimator`]:
//!
//! - [`LogisticPdModel`]: logistic regression over payment features
//! - [`PriorPdModel`]: a constant, for portfolios without a calibrated model
//!
//! [`estimate_pd`] wraps any estimator with the fallback policy, so PD
//! estimation never blocks an evaluation: thin history, a model error, a
//! non-finite output or a timeout all degrade to the configured prior PD.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use nalgebra::DVector;
use tracing::warn;

use crate::config::{LogisticSpec, PdPolicy};
use crate::domain::{Category, FeatureVector, PdSource};
use crate::error::{DegradedInputWarning, RiskError};

/// Inference contract for a PD model.
///
/// Implementations must be deterministic for a fixed `version()` and must
/// not rely on interior mutability: one instance is shared across threads.
pub trait PdEstimator: Send + Sync {
    fn version(&self) -> &str;

    /// Probability of default in `[0, 1]` from a payment feature vector.
    fn estimate(&self, features: &FeatureVector) -> Result<f64, RiskError>;
}

/// A PD together with how much it can be trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct PdEstimate {
    pub pd: f64,
    pub low_confidence: bool,
    pub source: PdSource,
    pub model_version: String,
    pub warning: Option<DegradedInputWarning>,
}

impl PdEstimate {
    /// A PD supplied by the caller (e.g. from an external scoring service).
    pub fn from_probability(pd: f64, model_version: impl Into<String>) -> Result<Self, RiskError> {
        if !(pd.is_finite() && (0.0..=1.0).contains(&pd)) {
            return Err(RiskError::validation("pd", format!("must be in [0, 1], got {pd}")));
        }
        Ok(Self {
            pd,
            low_confidence: false,
            source: PdSource::Supplied,
            model_version: model_version.into(),
            warning: None,
        })
    }

    fn prior(policy: &PdPolicy, model_version: &str, source: PdSource, warning: DegradedInputWarning) -> Self {
        Self {
            pd: policy.prior_pd,
            low_confidence: true,
            source,
            model_version: model_version.to_string(),
            warning: Some(warning),
        }
    }
}

/// Logistic regression: `pd = σ(intercept + Σ wᵢ · xᵢ)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticPdModel {
    version: String,
    intercept: f64,
    features: Vec<String>,
    weights: DVector<f64>,
}

impl LogisticPdModel {
    pub fn new(spec: &LogisticSpec) -> Self {
        Self {
            version: spec.version.clone(),
            intercept: spec.intercept,
            features: spec.coefficients.iter().map(|c| c.feature.clone()).collect(),
            weights: DVector::from_iterator(spec.coefficients.len(), spec.coefficients.iter().map(|c| c.weight)),
        }
    }
}

impl PdEstimator for LogisticPdModel {
    fn version(&self) -> &str {
        &self.version
    }

    fn estimate(&self, features: &FeatureVector) -> Result<f64, RiskError> {
        let mut x: DVector<f64> = DVector::zeros(self.features.len());
        for (i, name) in self.features.iter().enumerate() {
            x[i] = features
                .get(name)
                .ok_or_else(|| RiskError::model(&self.version, format!("feature '{name}' absent")))?;
        }
        let z = self.intercept + self.weights.dot(&x);
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

/// Always returns the same probability.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorPdModel {
    pd: f64,
}

impl PriorPdModel {
    pub fn new(pd: f64) -> Self {
        Self { pd }
    }
}

impl PdEstimator for PriorPdModel {
    fn version(&self) -> &str {
        "prior"
    }

    fn estimate(&self, _features: &FeatureVector) -> Result<f64, RiskError> {
        Ok(self.pd)
    }
}

/// Run `model` under the fallback policy, inline on the calling thread.
pub fn estimate_pd(model: &dyn PdEstimator, features: &FeatureVector, policy: &PdPolicy) -> PdEstimate {
    if let Some(prior) = thin_history(model.version(), features, policy) {
        return prior;
    }
    settle(model.version(), model.estimate(features), policy)
}

/// PD workers that timed out and are still running.
static STALLED_WORKERS: AtomicUsize = AtomicUsize::new(0);

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const ABANDONED: u8 = 2;

/// Like [`estimate_pd`], but bounded by `policy.timeout_ms`.
///
/// The model runs on a helper thread; if it has not answered in time the
/// prior is used and the thread is left to finish on its own. A thread cannot
/// be cancelled, so a model that hangs leaks one thread per timed-out call.
/// Once `policy.max_stalled_workers` such threads are alive, no new worker is
/// started and the prior is used straight away until some of them finish.
pub fn estimate_pd_with_timeout(
    model: Arc<dyn PdEstimator>,
    features: &FeatureVector,
    policy: &PdPolicy,
) -> PdEstimate {
    if policy.timeout_ms == 0 {
        return estimate_pd(model.as_ref(), features, policy);
    }
    let version = model.version().to_string();
    if let Some(prior) = thin_history(&version, features, policy) {
        return prior;
    }
    let stalled = STALLED_WORKERS.load(Ordering::Acquire);
    if stalled >= policy.max_stalled_workers {
        return fallback(
            &version,
            policy,
            format!("{stalled} stalled PD worker(s) still running; model not called"),
        );
    }

    let (tx, rx) = mpsc::channel();
    let owned = features.clone();
    let worker = Arc::clone(&model);
    let state = Arc::new(AtomicU8::new(RUNNING));
    let worker_state = Arc::clone(&state);
    let spawned = std::thread::Builder::new()
        .name("rift-pd".to_string())
        .spawn(move || {
            // Receiver may be gone after a timeout.
            let _ = tx.send(worker.estimate(&owned));
            if worker_state
                .compare_exchange(RUNNING, FINISHED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                STALLED_WORKERS.fetch_sub(1, Ordering::AcqRel);
            }
        });
    if let Err(e) = spawned {
        return fallback(&version, policy, format!("could not start PD worker: {e}"));
    }

    match rx.recv_timeout(Duration::from_millis(policy.timeout_ms)) {
        Ok(result) => settle(&version, result, policy),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            // Count before publishing ABANDONED so the worker's decrement never runs first.
            STALLED_WORKERS.fetch_add(1, Ordering::AcqRel);
            if state
                .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                STALLED_WORKERS.fetch_sub(1, Ordering::AcqRel);
            }
            fallback(
                &version,
                policy,
                format!("PD model timed out after {} ms", policy.timeout_ms),
            )
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            fallback(&version, policy, "PD model worker exited without a result".to_string())
        }
    }
}

fn thin_history(version: &str, features: &FeatureVector, policy: &PdPolicy) -> Option<PdEstimate> {
    let count = features.get("invoice_count").unwrap_or(0.0);
    if count >= f64::from(policy.min_invoice_count) {
        return None;
    }
    let warning = DegradedInputWarning::new(
        "pd",
        format!(
            "{count} invoice(s), below the minimum of {}; prior PD {} used (low confidence)",
            policy.min_invoice_count, policy.prior_pd
        ),
    );
    Some(PdEstimate::prior(policy, version, PdSource::Prior, warning))
}

fn settle(version: &str, result: Result<f64, RiskError>, policy: &PdPolicy) -> PdEstimate {
    match result {
        Ok(pd) if pd.is_finite() && (0.0..=1.0).contains(&pd) => PdEstimate {
            pd,
            low_confidence: false,
            source: PdSource::Model,
            model_version: version.to_string(),
            warning: None,
        },
        Ok(pd) => fallback(version, policy, format!("PD model returned {pd}, outside [0, 1]")),
        Err(e) => fallback(version, policy, e.to_string()),
    }
}

fn fallback(version: &str, policy: &PdPolicy, reason: String) -> PdEstimate {
    warn!(model = version, %reason, "PD model fallback to prior");
    let warning = DegradedInputWarning::new("pd", format!("{reason}; prior PD {} used", policy.prior_pd));
    PdEstimate::prior(policy, version, PdSource::Fallback, warning)
}

/// Check that a vector is fit to be scored: only payment features carry the model inputs.
pub fn check_pd_input(features: &FeatureVector) -> Result<(), RiskError> {
    if features.category() != Category::Payment {
        return Err(RiskError::validation(
            "pd",
            format!("PD features must come from the payment extractor, got {}", features.category().key()),
        ));
    }
    Ok(())
}
