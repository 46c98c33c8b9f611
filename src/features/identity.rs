//! Identity & integrity features.
//!
//! Registry flags form a weighted pass-rate; sanctions, PEP exposure and
//! adverse media then shrink it multiplicatively. A single sanctions hit
//! multiplies the score by `sanctions_decay` (5% by default), so it lands
//! near the floor instead of losing a linear slice.

use crate::config::IdentityRules;
use crate::domain::{Category, FeatureVector, RegistryFlags, SanctionsScreen};
use crate::error::RiskError;

/// Build the identity feature vector.
///
/// Every flag is compliance-critical: absent fields fail with a validation
/// error listing all of them, never a silent default.
pub fn compute_identity_features(
    registry: &RegistryFlags,
    sanctions: &SanctionsScreen,
    rules: &IdentityRules,
) -> Result<FeatureVector, RiskError> {
    let mut missing = Vec::new();
    let mut need_flag = |name: &str, v: Option<bool>| {
        if v.is_none() {
            missing.push(format!("identity.{name}"));
        }
        v.unwrap_or(false)
    };
    let lei = need_flag("lei_valid", registry.lei_valid);
    let vat = need_flag("vat_valid", registry.vat_valid);
    let eori = need_flag("eori_valid", registry.eori_valid);
    let kyb = need_flag("kyb_passed", registry.kyb_passed);
    let pep = need_flag("pep", sanctions.pep);
    if sanctions.sanctions_hits.is_none() {
        missing.push("identity.sanctions_hits".to_string());
    }
    if sanctions.adverse_media_count.is_none() {
        missing.push("identity.adverse_media_count".to_string());
    }
    if !missing.is_empty() {
        return Err(RiskError::missing(missing));
    }
    let hits = sanctions.sanctions_hits.unwrap_or_default();
    let media = sanctions.adverse_media_count.unwrap_or_default();

    let flags = [
        (lei, rules.lei_weight),
        (vat, rules.vat_weight),
        (eori, rules.eori_weight),
        (kyb, rules.kyb_weight),
    ];
    let total_weight: f64 = flags.iter().map(|(_, w)| w).sum();
    let passed: f64 = flags.iter().filter(|(ok, _)| *ok).map(|(_, w)| w).sum();
    let pass_rate = if total_weight > 0.0 { passed / total_weight } else { 0.0 };

    let sanctions_factor = rules.sanctions_decay.powi(saturating_exp(hits));
    let pep_factor = if pep { rules.pep_factor } else { 1.0 };
    let media_factor = rules
        .adverse_media_decay
        .powi(saturating_exp(media.min(rules.adverse_media_cap)));

    // Each multiplier takes its share from what is left after the previous one.
    let registry = 100.0 * pass_rate;
    let after_sanctions = registry * sanctions_factor;
    let after_pep = after_sanctions * pep_factor;
    let score = (after_pep * media_factor).clamp(0.0, 100.0);
    let flag_loss = |ok: bool, weight: f64| {
        if ok || total_weight <= 0.0 {
            0.0
        } else {
            100.0 * weight / total_weight
        }
    };

    let mut b = FeatureVector::builder(Category::Identity);
    b.push_flag("lei_valid", lei)?;
    b.push_flag("vat_valid", vat)?;
    b.push_flag("eori_valid", eori)?;
    b.push_flag("kyb_passed", kyb)?;
    b.push_count("sanctions_hits", hits)?;
    b.push_flag("pep", pep)?;
    b.push_count("adverse_media_count", media)?;
    b.push_score(
        "compliance_score",
        score,
        &[
            ("sanctions_hits", registry - after_sanctions),
            ("kyb_passed", flag_loss(kyb, rules.kyb_weight)),
            ("pep", after_sanctions - after_pep),
            ("adverse_media_count", after_pep - after_pep * media_factor),
            ("lei_valid", flag_loss(lei, rules.lei_weight)),
            ("vat_valid", flag_loss(vat, rules.vat_weight)),
            ("eori_valid", flag_loss(eori, rules.eori_weight)),
        ],
    )?;
    Ok(b.build())
}

/// `powi` exponent from a count, saturating instead of wrapping negative.
fn saturating_exp(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightConfig;

    fn clean_registry() -> RegistryFlags {
        RegistryFlags {
            lei_valid: Some(true),
            vat_valid: Some(true),
            eori_valid: Some(true),
            kyb_passed: Some(true),
        }
    }

    fn screen(hits: u32, pep: bool, media: u32) -> SanctionsScreen {
        SanctionsScreen {
            sanctions_hits: Some(hits),
            pep: Some(pep),
            adverse_media_count: Some(media),
        }
    }

    #[test]
    fn clean_counterparty_scores_at_ceiling() {
        let rules = WeightConfig::default().rules.identity;
        let v = compute_identity_features(&clean_registry(), &screen(0, false, 0), &rules).unwrap();
        assert_eq!(v.get("compliance_score"), Some(100.0));
        assert_eq!(v.get("kyb_passed"), Some(1.0));
    }

    #[test]
    fn single_sanctions_hit_drives_score_toward_floor() {
        let rules = WeightConfig::default().rules.identity;
        let v = compute_identity_features(&clean_registry(), &screen(1, false, 0), &rules).unwrap();
        let score = v.get("compliance_score").unwrap();
        assert!(score <= 10.0, "one hit should be near the floor, got {score}");
    }

    #[test]
    fn sanctions_hits_are_monotone_non_increasing() {
        let rules = WeightConfig::default().rules.identity;
        for pep in [false, true] {
            for media in [0, 2, 9] {
                let mut prev = f64::INFINITY;
                for hits in 0..8 {
                    let v = compute_identity_features(&clean_registry(), &screen(hits, pep, media), &rules)
                        .unwrap();
                    let s = v.get("compliance_score").unwrap();
                    assert!(s <= prev, "hits={hits} raised the score: {s} > {prev}");
                    assert!((0.0..=100.0).contains(&s));
                    prev = s;
                }
            }
        }
    }

    #[test]
    fn adverse_media_penalty_is_capped() {
        let rules = WeightConfig::default().rules.identity;
        let at_cap = compute_identity_features(&clean_registry(), &screen(0, false, 5), &rules).unwrap();
        let beyond = compute_identity_features(&clean_registry(), &screen(0, false, 50), &rules).unwrap();
        assert_eq!(at_cap.get("compliance_score"), beyond.get("compliance_score"));
        assert!(at_cap.get("compliance_score").unwrap() < 100.0);
    }

    #[test]
    fn failed_kyb_lowers_pass_rate() {
        let rules = WeightConfig::default().rules.identity;
        let mut registry = clean_registry();
        registry.kyb_passed = Some(false);
        let v = compute_identity_features(&registry, &screen(0, false, 0), &rules).unwrap();
        assert!((v.get("compliance_score").unwrap() - 50.0).abs() < 1e-9);
    }

    fn impact(v: &FeatureVector, input: &str) -> f64 {
        v.feature("compliance_score")
            .unwrap()
            .inputs
            .iter()
            .find(|i| i.feature == input)
            .map(|i| i.points_lost)
            .unwrap()
    }

    #[test]
    fn failed_flags_carry_the_lost_points() {
        let rules = WeightConfig::default().rules.identity;
        let registry = RegistryFlags {
            lei_valid: Some(false),
            vat_valid: Some(false),
            ..clean_registry()
        };
        let v = compute_identity_features(&registry, &screen(0, false, 0), &rules).unwrap();
        assert!((v.get("compliance_score").unwrap() - 60.0).abs() < 1e-9);
        assert!((impact(&v, "lei_valid") - 20.0).abs() < 1e-9);
        assert!((impact(&v, "vat_valid") - 20.0).abs() < 1e-9);
        for clean in ["sanctions_hits", "kyb_passed", "pep", "adverse_media_count", "eori_valid"] {
            assert_eq!(impact(&v, clean), 0.0, "{clean}");
        }
    }

    #[test]
    fn input_impacts_add_up_to_the_score_gap() {
        let rules = WeightConfig::default().rules.identity;
        let mut registry = clean_registry();
        registry.eori_valid = Some(false);
        for (hits, pep, media) in [(0, true, 0), (1, false, 3), (2, true, 9)] {
            let v = compute_identity_features(&registry, &screen(hits, pep, media), &rules).unwrap();
            let lost: f64 = v.feature("compliance_score").unwrap().inputs.iter().map(|i| i.points_lost).sum();
            assert!((100.0 - v.get("compliance_score").unwrap() - lost).abs() < 1e-9);
        }
    }

    #[test]
    fn oversized_media_cap_saturates_instead_of_wrapping() {
        let mut rules = WeightConfig::default().rules.identity;
        rules.adverse_media_cap = u32::MAX;
        let v = compute_identity_features(&clean_registry(), &screen(0, false, u32::MAX), &rules).unwrap();
        let score = v.get("compliance_score").unwrap();
        assert!(score < 1.0, "media penalty wrapped into a bonus: {score}");
    }

    #[test]
    fn absent_flags_fail_naming_every_field() {
        let rules = WeightConfig::default().rules.identity;
        let registry = RegistryFlags {
            lei_valid: None,
            kyb_passed: None,
            ..clean_registry()
        };
        let sanctions = SanctionsScreen {
            sanctions_hits: None,
            ..screen(0, false, 0)
        };
        let err = compute_identity_features(&registry, &sanctions, &rules).unwrap_err();
        assert!(matches!(err, RiskError::Validation { .. }));
        assert_eq!(
            err.fields(),
            vec!["identity.lei_valid", "identity.kyb_passed", "identity.sanctions_hits"]
        );
    }
}
