//! ESG features.
//!
//! ```text
//! score = base + min(Σ min(increment(cert), per_cert_cap), total_cert_cap)
//!       − first_penalty · (1 − decay^n) / (1 − decay)
//! score = clamp(score, 0, 100), then capped at opaque_cap without transparent governance
//! ```

use std::collections::BTreeSet;

use crate::config::EsgRules;
use crate::domain::{Category, EsgProfile, FeatureDomain, FeatureVector};
use crate::error::RiskError;
use crate::math::canonical_label;

pub fn compute_esg_features(profile: &EsgProfile, rules: &EsgRules) -> Result<FeatureVector, RiskError> {
    let mut b = FeatureVector::builder(Category::Esg);

    let labels: BTreeSet<String> = profile
        .certifications
        .iter()
        .map(|c| canonical_label(c))
        .filter(|c| !c.is_empty())
        .collect();

    let mut recognized = 0u32;
    let mut points = 0.0;
    for label in &labels {
        match rules.certifications.get(label) {
            Some(increment) => {
                recognized += 1;
                points += increment.min(rules.per_certification_cap);
            }
            None => b.warn("certifications", format!("unrecognized certification '{label}' ignored")),
        }
    }
    let points = points.min(rules.total_certification_cap);

    let controversies = match profile.controversy_count {
        Some(n) => n,
        None => {
            b.warn("controversy_count", "absent; treated as 0");
            0
        }
    };
    let transparent = match profile.governance_transparent {
        Some(t) => t,
        None => {
            b.warn("governance_transparent", "absent; treated as opaque");
            false
        }
    };

    let penalty = controversy_penalty(controversies, rules.controversy_penalty, rules.controversy_decay);
    let ceiling = (rules.base_score + rules.total_certification_cap).clamp(0.0, 100.0);
    let certified = (rules.base_score + points).clamp(0.0, 100.0);
    let penalized = (rules.base_score + points - penalty).clamp(0.0, 100.0);
    let score = if transparent {
        penalized
    } else {
        penalized.min(rules.opaque_cap)
    };

    b.push_count("certification_count", recognized)?;
    b.push("certification_points", points, FeatureDomain::NonNegative)?;
    b.push_count("controversy_count", controversies)?;
    b.push_flag("governance_transparent", transparent)?;
    b.push_score(
        "sustainability_score",
        score,
        &[
            ("controversy_count", certified - penalized),
            ("governance_transparent", penalized - score),
            ("certification_points", ceiling - certified),
        ],
    )?;
    Ok(b.build())
}

/// Geometric series: the first controversy costs `first`, each further one `decay` times the previous.
fn controversy_penalty(count: u32, first: f64, decay: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count.min(i32::MAX as u32) as i32;
    first * (1.0 - decay.powi(n)) / (1.0 - decay)
}
