//! Financial health features.
//!
//! Ratios are computed from the statement snapshot and bank statistics, then
//! mapped to `[0, 100]` through the configured rules:
//!
//! | score                 | ratios                               |
//! |-----------------------|--------------------------------------|
//! | `liquidity_score`     | current ratio, quick ratio           |
//! | `coverage_score`      | DSCR, interest coverage              |
//! | `profitability_score` | gross margin                         |
//! | `banking_score`       | returned-item rate, cash buffer days |
//!
//! A denominator that is present but not positive is a validation error:
//! an infinite ratio must never reach the report.

use crate::config::FinancialRules;
use crate::domain::{BankStats, Category, FeatureDomain, FeatureVector, FeatureVectorBuilder, FinancialStatement};
use crate::error::RiskError;
use crate::math::mean;

pub fn compute_financial_features(
    statement: &FinancialStatement,
    bank: &BankStats,
    rules: &FinancialRules,
) -> Result<FeatureVector, RiskError> {
    check_finite(statement)?;

    let mut missing = Vec::new();
    if statement.current_assets.is_none() {
        missing.push("financial.current_assets".to_string());
    }
    if statement.current_liabilities.is_none() {
        missing.push("financial.current_liabilities".to_string());
    }
    if !missing.is_empty() {
        return Err(RiskError::missing(missing));
    }
    let current_assets = statement.current_assets.unwrap_or_default();
    let current_liabilities = statement.current_liabilities.unwrap_or_default();

    let mut bad_denominators = Vec::new();
    if current_liabilities <= 0.0 {
        bad_denominators.push("financial.current_liabilities".to_string());
    }
    for (name, value) in [
        ("debt_service", statement.debt_service),
        ("interest_expense", statement.interest_expense),
        ("revenue_ttm", statement.revenue_ttm),
    ] {
        if value.is_some_and(|v| v <= 0.0) {
            bad_denominators.push(format!("financial.{name}"));
        }
    }
    if bank.tx_out_count == Some(0) {
        bad_denominators.push("financial.tx_out_count".to_string());
    }
    if !bad_denominators.is_empty() {
        return Err(RiskError::Validation {
            fields: bad_denominators,
            reason: "ratio denominator must be > 0".to_string(),
        });
    }
    if bank.returned_count.is_some() && bank.tx_out_count.is_none() {
        return Err(RiskError::validation(
            "financial.tx_out_count",
            "required when returned_count is present",
        ));
    }

    let mut b = FeatureVector::builder(Category::Financial);

    // Liquidity.
    let current_ratio = current_assets / current_liabilities;
    b.push("current_ratio", current_ratio, FeatureDomain::Real)?;
    let mut liquidity = vec![(rules.current_ratio.score(current_ratio), "current_ratio")];
    match (statement.cash, statement.ar) {
        (Some(cash), Some(ar)) => {
            let quick_ratio = (cash + ar) / current_liabilities;
            b.push("quick_ratio", quick_ratio, FeatureDomain::Real)?;
            liquidity.push((rules.quick_ratio.score(quick_ratio), "quick_ratio"));
        }
        _ => b.warn("quick_ratio", "cash or ar absent; liquidity uses current ratio only"),
    }
    push_mean_score(&mut b, "liquidity_score", &liquidity)?;

    // Coverage.
    let mut coverage = Vec::new();
    match statement.ebitda {
        Some(ebitda) => {
            if let Some(debt_service) = statement.debt_service {
                let dscr = ebitda / debt_service;
                b.push("dscr", dscr, FeatureDomain::Real)?;
                coverage.push((rules.dscr.score(dscr), "dscr"));
            }
            if let Some(interest) = statement.interest_expense {
                let icr = ebitda / interest;
                b.push("interest_coverage", icr, FeatureDomain::Real)?;
                coverage.push((rules.interest_coverage.score(icr), "interest_coverage"));
            }
        }
        None => {
            if statement.debt_service.is_some() || statement.interest_expense.is_some() {
                b.warn("ebitda", "absent; coverage ratios cannot be computed");
            }
        }
    }
    if coverage.is_empty() {
        b.warn("coverage_score", "no coverage ratio available");
    } else {
        push_mean_score(&mut b, "coverage_score", &coverage)?;
    }

    // Profitability.
    match (statement.revenue_ttm, statement.cogs_ttm) {
        (Some(revenue), Some(cogs)) => {
            let margin = (revenue - cogs) / revenue;
            b.push("gross_margin", margin, FeatureDomain::Real)?;
            push_mean_score(
                &mut b,
                "profitability_score",
                &[(rules.gross_margin.score(margin), "gross_margin")],
            )?;
        }
        _ => b.warn("profitability_score", "revenue_ttm or cogs_ttm absent"),
    }

    // Banking behaviour.
    let mut banking = Vec::new();
    if let (Some(returned), Some(tx_out)) = (bank.returned_count, bank.tx_out_count) {
        let rate = f64::from(returned) / f64::from(tx_out);
        b.push("returned_item_rate", rate, FeatureDomain::NonNegative)?;
        banking.push((rules.returned_item_rate.score(rate), "returned_item_rate"));
    }
    if let Some(days) = bank.cash_buffer_days {
        b.push_count("cash_buffer_days", days)?;
        banking.push((rules.cash_buffer_days.score(f64::from(days)), "cash_buffer_days"));
    }
    if banking.is_empty() {
        b.warn("banking_score", "no bank activity statistics supplied");
    } else {
        push_mean_score(&mut b, "banking_score", &banking)?;
    }

    Ok(b.build())
}

fn check_finite(statement: &FinancialStatement) -> Result<(), RiskError> {
    let fields = [
        ("current_assets", statement.current_assets),
        ("current_liabilities", statement.current_liabilities),
        ("cash", statement.cash),
        ("ar", statement.ar),
        ("debt_service", statement.debt_service),
        ("ebitda", statement.ebitda),
        ("interest_expense", statement.interest_expense),
        ("revenue_ttm", statement.revenue_ttm),
        ("cogs_ttm", statement.cogs_ttm),
    ];
    let bad: Vec<String> = fields
        .iter()
        .filter(|(_, v)| v.is_some_and(|x| !x.is_finite()))
        .map(|(name, _)| format!("financial.{name}"))
        .collect();
    if bad.is_empty() {
        Ok(())
    } else {
        Err(RiskError::Validation {
            fields: bad,
            reason: "figure must be finite".to_string(),
        })
    }
}

fn push_mean_score(
    b: &mut FeatureVectorBuilder,
    name: &str,
    parts: &[(f64, &str)],
) -> Result<(), RiskError> {
    let scores: Vec<f64> = parts.iter().map(|(s, _)| *s).collect();
    let score = mean(&scores).unwrap_or(0.0).clamp(0.0, 100.0);
    // Each ratio owns an equal share of the mean.
    let share = 1.0 / parts.len().max(1) as f64;
    let inputs: Vec<(&str, f64)> = parts.iter().map(|(s, n)| (*n, share * (100.0 - s))).collect();
    b.push_score(name, score, &inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightConfig;

    fn worked_statement() -> FinancialStatement {
        FinancialStatement {
            current_assets: Some(200_000.0),
            current_liabilities: Some(120_000.0),
            cash: Some(50_000.0),
            ar: Some(80_000.0),
            debt_service: Some(10_000.0),
            ebitda: Some(40_000.0),
            interest_expense: Some(5_000.0),
            revenue_ttm: Some(600_000.0),
            cogs_ttm: Some(360_000.0),
        }
    }

    fn worked_bank() -> BankStats {
        BankStats {
            returned_count: Some(0),
            tx_out_count: Some(120),
            cash_buffer_days: Some(45),
        }
    }

    #[test]
    fn worked_example_ratios_and_scores() {
        let rules = WeightConfig::default().rules.financial;
        let v = compute_financial_features(&worked_statement(), &worked_bank(), &rules).unwrap();

        assert!((v.get("current_ratio").unwrap() - 200_000.0 / 120_000.0).abs() < 1e-12);
        assert!((v.get("dscr").unwrap() - 4.0).abs() < 1e-12);
        assert!((v.get("gross_margin").unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(v.get("returned_item_rate"), Some(0.0));

        // CR 1.67 → 85, quick 1.08 → 80.
        assert!((v.get("liquidity_score").unwrap() - 82.5).abs() < 1e-9);
        assert_eq!(v.get("coverage_score"), Some(100.0));
        assert!((v.get("profitability_score").unwrap() - 80.0).abs() < 1e-9);
        assert!((v.get("banking_score").unwrap() - 87.5).abs() < 1e-9);
        assert!(v.warnings().is_empty());

        // (100 − 85) / 2 and (100 − 80) / 2
        let liquidity = &v.feature("liquidity_score").unwrap().inputs;
        assert_eq!(liquidity[0].feature, "current_ratio");
        assert!((liquidity[0].points_lost - 7.5).abs() < 1e-9);
        assert!((liquidity[1].points_lost - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_current_liabilities_is_a_validation_error() {
        let rules = WeightConfig::default().rules.financial;
        let mut s = worked_statement();
        s.current_liabilities = Some(0.0);
        let err = compute_financial_features(&s, &worked_bank(), &rules).unwrap_err();
        assert!(matches!(err, RiskError::Validation { .. }));
        assert_eq!(err.fields(), vec!["financial.current_liabilities"]);
    }

    #[test]
    fn every_bad_denominator_is_named() {
        let rules = WeightConfig::default().rules.financial;
        let mut s = worked_statement();
        s.revenue_ttm = Some(0.0);
        s.debt_service = Some(-1.0);
        let bank = BankStats {
            tx_out_count: Some(0),
            ..worked_bank()
        };
        let err = compute_financial_features(&s, &bank, &rules).unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["financial.debt_service", "financial.revenue_ttm", "financial.tx_out_count"]
        );
    }

    #[test]
    fn non_finite_figures_are_rejected() {
        let rules = WeightConfig::default().rules.financial;
        let mut s = worked_statement();
        s.ebitda = Some(f64::NAN);
        let err = compute_financial_features(&s, &worked_bank(), &rules).unwrap_err();
        assert_eq!(err.fields(), vec!["financial.ebitda"]);
    }

    #[test]
    fn missing_optional_inputs_omit_scores_with_warnings() {
        let rules = WeightConfig::default().rules.financial;
        let s = FinancialStatement {
            current_assets: Some(100.0),
            current_liabilities: Some(100.0),
            ..Default::default()
        };
        let v = compute_financial_features(&s, &BankStats::default(), &rules).unwrap();
        assert_eq!(v.get("liquidity_score"), Some(50.0));
        assert!(!v.contains("coverage_score"));
        assert!(!v.contains("profitability_score"));
        assert!(!v.contains("banking_score"));
        let fields: Vec<&str> = v.warnings().iter().map(|w| w.field.as_str()).collect();
        assert!(fields.contains(&"financial.coverage_score"));
        assert!(fields.contains(&"financial.banking_score"));
    }

    #[test]
    fn negative_ebitda_is_allowed_and_floors_coverage() {
        let rules = WeightConfig::default().rules.financial;
        let mut s = worked_statement();
        s.ebitda = Some(-5_000.0);
        let v = compute_financial_features(&s, &worked_bank(), &rules).unwrap();
        assert!(v.get("dscr").unwrap() < 0.0);
        assert!((v.get("coverage_score").unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn returned_items_without_tx_count_is_rejected() {
        let rules = WeightConfig::default().rules.financial;
        let bank = BankStats {
            returned_count: Some(2),
            tx_out_count: None,
            cash_buffer_days: None,
        };
        let err = compute_financial_features(&worked_statement(), &bank, &rules).unwrap_err();
        assert_eq!(err.fields(), vec!["financial.tx_out_count"]);
    }
}
