//! Normalisation rules mapping raw values onto `[0, 100]` scores.
//!
//! Three rule kinds cover every feature the extractors score:
//!
//! - `LinearClip`: linear interpolation between two anchor points, clipped
//! - `Bands`: ordered threshold bands with a floor
//! - `LookupTable`: categorical labels (shipment status, certifications)
//!
//! Rules are plain data so they can live in a versioned weight config.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Which side of a threshold is the good side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// A single threshold band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub threshold: f64,
    pub score: f64,
}

/// Numeric normalisation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationRule {
    /// `lo → score_at_lo`, `hi → score_at_hi`, linear in between, clipped outside.
    LinearClip {
        lo: f64,
        hi: f64,
        score_at_lo: f64,
        score_at_hi: f64,
    },
    /// For `HigherIsBetter` the first band with `value >= threshold` wins
    /// (thresholds strictly descending); for `LowerIsBetter` the first band
    /// with `value <= threshold` wins (thresholds strictly ascending).
    /// Values matching no band score `floor`.
    Bands {
        direction: Direction,
        floor: f64,
        bands: Vec<Band>,
    },
}

impl NormalizationRule {
    pub fn linear(lo: f64, hi: f64, score_at_lo: f64, score_at_hi: f64) -> Self {
        NormalizationRule::LinearClip {
            lo,
            hi,
            score_at_lo,
            score_at_hi,
        }
    }

    pub fn bands(direction: Direction, bands: &[(f64, f64)], floor: f64) -> Self {
        NormalizationRule::Bands {
            direction,
            floor,
            bands: bands
                .iter()
                .map(|&(threshold, score)| Band { threshold, score })
                .collect(),
        }
    }

    /// Score a finite raw value. Non-finite input scores 0.
    pub fn score(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.0;
        }
        let raw = match self {
            NormalizationRule::LinearClip {
                lo,
                hi,
                score_at_lo,
                score_at_hi,
            } => {
                let u = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
                score_at_lo + u * (score_at_hi - score_at_lo)
            }
            NormalizationRule::Bands {
                direction,
                bands,
                floor,
            } => {
                let hit = match direction {
                    Direction::HigherIsBetter => bands.iter().find(|b| value >= b.threshold),
                    Direction::LowerIsBetter => bands.iter().find(|b| value <= b.threshold),
                };
                hit.map(|b| b.score).unwrap_or(*floor)
            }
        };
        raw.clamp(0.0, 100.0)
    }

    pub fn validate(&self, field: &str) -> Result<(), RiskError> {
        match self {
            NormalizationRule::LinearClip {
                lo,
                hi,
                score_at_lo,
                score_at_hi,
            } => {
                if !(lo.is_finite() && hi.is_finite() && hi > lo) {
                    return Err(RiskError::config(field, format!("linear clip needs lo < hi (lo={lo}, hi={hi})")));
                }
                check_score(field, *score_at_lo)?;
                check_score(field, *score_at_hi)?;
            }
            NormalizationRule::Bands {
                direction,
                bands,
                floor,
            } => {
                if bands.is_empty() {
                    return Err(RiskError::config(field, "bands must not be empty"));
                }
                check_score(field, *floor)?;
                for b in bands {
                    if !b.threshold.is_finite() {
                        return Err(RiskError::config(field, "band threshold must be finite"));
                    }
                    check_score(field, b.score)?;
                }
                let ordered = bands.windows(2).all(|w| match direction {
                    Direction::HigherIsBetter => w[0].threshold > w[1].threshold,
                    Direction::LowerIsBetter => w[0].threshold < w[1].threshold,
                });
                if !ordered {
                    return Err(RiskError::config(
                        field,
                        "band thresholds must be strictly ordered (descending for higher_is_better, ascending for lower_is_better)",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Categorical label → score table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTable {
    /// Score for labels not in `entries`; `None` means unrecognized labels are rejected by the caller.
    #[serde(default)]
    pub default: Option<f64>,
    pub entries: BTreeMap<String, f64>,
}

impl LookupTable {
    pub fn new(entries: &[(&str, f64)], default: Option<f64>) -> Self {
        Self {
            default,
            entries: entries.iter().map(|&(k, v)| (k.to_string(), v)).collect(),
        }
    }

    /// Exact entry match after canonicalisation, ignoring `default`.
    pub fn get(&self, label: &str) -> Option<f64> {
        let key = canonical_label(label);
        self.entries
            .iter()
            .find(|(k, _)| canonical_label(k) == key)
            .map(|(_, v)| *v)
    }

    /// Entry match, falling back to `default`.
    pub fn score(&self, label: &str) -> Option<f64> {
        self.get(label).or(self.default)
    }

    pub fn validate(&self, field: &str) -> Result<(), RiskError> {
        for (k, v) in &self.entries {
            check_score(&format!("{field}.{k}"), *v)?;
        }
        if let Some(d) = self.default {
            check_score(&format!("{field}.default"), d)?;
        }
        Ok(())
    }
}

/// Uppercase ASCII alphanumerics only: `"iso 14001"` and `"ISO-14001"` both become `"ISO14001"`.
pub fn canonical_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn check_score(field: &str, score: f64) -> Result<(), RiskError> {
    if !(score.is_finite() && (0.0..=100.0).contains(&score)) {
        return Err(RiskError::config(field, format!("score {score} outside [0, 100]")));
    }
    Ok(())
}
