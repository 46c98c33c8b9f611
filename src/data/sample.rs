//! Synthetic counterparty portfolios for demos, batch runs and tests.
//!
//! Each counterparty draws one latent quality factor `q ~ N(0, 1)`; every
//! input record is then sampled conditionally on it, so good names tend to
//! be liquid, pay on time and hold certifications, with enough noise that
//! the categories do not move in lockstep.

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Normal};

use crate::domain::{
    BankStats, Counterparty, EsgProfile, FinancialRecord, FinancialStatement, IdentityRecord, InsuranceTerms,
    Invoice, RegistryFlags, SanctionsScreen, ShipmentStatus, TradeFlow, TradeRecord,
};
use crate::error::RiskError;

/// Certification labels the generator draws from; one is deliberately unrecognized.
const CERTIFICATIONS: [&str; 6] = ["ISO 14001", "ISO 45001", "B Corp", "EcoVadis", "FSC", "GreenLeaf Pledge"];

/// Evaluation date used for generated portfolios.
pub fn sample_asof() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 15).unwrap_or_default()
}

/// The documented worked example: a clean, liquid counterparty with one late
/// and one overdue invoice, insured trade and a single ISO 14001 certificate.
pub fn demo_counterparty() -> Counterparty {
    let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap_or_default();
    Counterparty {
        id: "DEMO-001".to_string(),
        asof: sample_asof(),
        ead: 150_000.0,
        identity: IdentityRecord {
            registry: RegistryFlags {
                lei_valid: Some(true),
                vat_valid: Some(true),
                eori_valid: Some(true),
                kyb_passed: Some(true),
            },
            sanctions: SanctionsScreen {
                sanctions_hits: Some(0),
                pep: Some(false),
                adverse_media_count: Some(0),
            },
        },
        financial: FinancialRecord {
            statement: FinancialStatement {
                current_assets: Some(200_000.0),
                current_liabilities: Some(120_000.0),
                cash: Some(50_000.0),
                ar: Some(80_000.0),
                debt_service: Some(10_000.0),
                ebitda: Some(40_000.0),
                interest_expense: Some(5_000.0),
                revenue_ttm: Some(600_000.0),
                cogs_ttm: Some(360_000.0),
            },
            bank: BankStats {
                returned_count: Some(0),
                tx_out_count: Some(120),
                cash_buffer_days: Some(45),
            },
        },
        invoices: vec![
            Invoice {
                issue_date: d(2025, 6, 1),
                due_date: d(2025, 7, 1),
                paid_date: Some(d(2025, 6, 28)),
                amount: 50_000.0,
            },
            Invoice {
                issue_date: d(2025, 7, 10),
                due_date: d(2025, 8, 10),
                paid_date: Some(d(2025, 8, 15)),
                amount: 60_000.0,
            },
            Invoice {
                issue_date: d(2025, 8, 20),
                due_date: d(2025, 9, 20),
                paid_date: None,
                amount: 40_000.0,
            },
        ],
        trade: TradeRecord {
            flow: TradeFlow {
                delivered: Some(true),
                status: Some("Delivered".to_string()),
                loss_ratio: Some(0.2),
            },
            insurance: Some(InsuranceTerms {
                insured_ratio: 0.8,
                payout_prob: 0.9,
                deductible_ratio: 0.1,
            }),
        },
        esg: EsgProfile {
            certifications: vec!["ISO14001".to_string()],
            controversy_count: Some(0),
            governance_transparent: Some(true),
        },
        score_override: None,
    }
}

/// Generate `count` counterparties from `seed`. Same inputs, same portfolio.
pub fn generate_portfolio(count: usize, seed: u64) -> Result<Vec<Counterparty>, RiskError> {
    if count == 0 {
        return Err(RiskError::validation("sample_count", "must be > 0"));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::<f64>::new(0.0, 1.0).map_err(|e| RiskError::data("sample", format!("normal: {e}")))?;
    let amounts = LogNormal::<f64>::new(9.5, 0.8).map_err(|e| RiskError::data("sample", format!("lognormal: {e}")))?;

    let asof = sample_asof();
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let q: f64 = normal.sample(&mut rng);
        out.push(Counterparty {
            id: format!("CP-{:04}", i + 1),
            asof,
            ead: (amounts.sample(&mut rng) * 10.0).round(),
            identity: sample_identity(&mut rng, q),
            financial: sample_financial(&mut rng, &normal, q),
            invoices: sample_invoices(&mut rng, &normal, &amounts, asof, q),
            trade: sample_trade(&mut rng, q),
            esg: sample_esg(&mut rng, q),
            score_override: None,
        });
    }
    Ok(out)
}

fn sample_identity(rng: &mut StdRng, q: f64) -> IdentityRecord {
    let fail = |rng: &mut StdRng, base: f64| rng.gen_bool((base - 0.05 * q).clamp(0.0, 0.5));
    IdentityRecord {
        registry: RegistryFlags {
            lei_valid: Some(!fail(rng, 0.05)),
            vat_valid: Some(!fail(rng, 0.03)),
            eori_valid: Some(!fail(rng, 0.10)),
            kyb_passed: Some(!fail(rng, 0.04)),
        },
        sanctions: SanctionsScreen {
            sanctions_hits: Some(u32::from(rng.gen_bool(0.01))),
            pep: Some(rng.gen_bool(0.04)),
            adverse_media_count: Some(if q < -1.0 { rng.gen_range(0..4) } else { rng.gen_range(0..2) }),
        },
    }
}

fn sample_financial(rng: &mut StdRng, normal: &Normal<f64>, q: f64) -> FinancialRecord {
    let liabilities = rng.gen_range(50_000.0..500_000.0_f64).round();
    let current_ratio = (0.35 + 0.30 * q + 0.15 * normal.sample(rng)).exp();
    let current_assets = (liabilities * current_ratio).round();
    let cash = (current_assets * rng.gen_range(0.1..0.4)).round();
    let ar = (current_assets * rng.gen_range(0.2..0.5)).round();
    let debt_service = (liabilities * rng.gen_range(0.05..0.15)).round();
    let dscr = (0.6 + 0.5 * q + 0.3 * normal.sample(rng)).exp();
    let ebitda = (debt_service * dscr).round();
    let revenue = (liabilities * rng.gen_range(2.0..6.0)).round();
    let margin = (0.30 + 0.10 * q + 0.05 * normal.sample(rng)).clamp(-0.2, 0.8);
    let tx_out = rng.gen_range(20..300u32);
    let returned = if q < -0.5 { rng.gen_range(0..tx_out / 10 + 1) } else { u32::from(rng.gen_bool(0.2)) };

    FinancialRecord {
        statement: FinancialStatement {
            current_assets: Some(current_assets),
            current_liabilities: Some(liabilities),
            cash: Some(cash),
            ar: Some(ar),
            debt_service: Some(debt_service),
            ebitda: Some(ebitda),
            // Smaller names often file without interest detail.
            interest_expense: rng.gen_bool(0.8).then(|| (debt_service * 0.4).round()),
            revenue_ttm: Some(revenue),
            cogs_ttm: Some((revenue * (1.0 - margin)).round()),
        },
        bank: BankStats {
            returned_count: Some(returned),
            tx_out_count: Some(tx_out),
            cash_buffer_days: rng
                .gen_bool(0.9)
                .then(|| (30.0 + 20.0 * q + 10.0 * normal.sample(rng)).clamp(0.0, 180.0).round() as u32),
        },
    }
}

fn sample_invoices(
    rng: &mut StdRng,
    normal: &Normal<f64>,
    amounts: &LogNormal<f64>,
    asof: NaiveDate,
    q: f64,
) -> Vec<Invoice> {
    let n = rng.gen_range(0..=12usize);
    let mut issue = asof - Duration::days(30 * n as i64 + 45);
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let terms = [30, 45, 60][rng.gen_range(0..3usize)];
        let due = issue + Duration::days(terms);
        let delay = (4.0 - 6.0 * q + 8.0 * normal.sample(rng)).round() as i64;
        let unpaid = rng.gen_bool((0.08 - 0.05 * q).clamp(0.01, 0.4));
        let paid = due + Duration::days(delay);
        out.push(Invoice {
            issue_date: issue,
            due_date: due,
            paid_date: if unpaid { None } else { Some(paid.max(issue)) },
            amount: amounts.sample(rng).round().max(1.0),
        });
        issue += Duration::days(rng.gen_range(20..40));
    }
    out
}

fn sample_trade(rng: &mut StdRng, q: f64) -> TradeRecord {
    let roll: f64 = rng.r#gen();
    let disputed = (0.05 - 0.03 * q).clamp(0.01, 0.2);
    let status = if roll < disputed {
        ShipmentStatus::Disputed
    } else if roll < 0.25 {
        ShipmentStatus::InTransit
    } else if roll < 0.35 {
        ShipmentStatus::Pending
    } else {
        ShipmentStatus::Delivered
    };
    TradeRecord {
        flow: TradeFlow {
            delivered: Some(status == ShipmentStatus::Delivered),
            status: Some(status.label().to_string()),
            loss_ratio: Some((rng.gen_range(0.0..0.3) - 0.05 * q).clamp(0.0, 1.0)),
        },
        insurance: rng.gen_bool(0.7).then(|| InsuranceTerms {
            insured_ratio: rng.gen_range(0.5..0.95),
            payout_prob: rng.gen_range(0.7..0.98),
            deductible_ratio: rng.gen_range(0.0..0.2),
        }),
    }
}

fn sample_esg(rng: &mut StdRng, q: f64) -> EsgProfile {
    let k = ((1.0 + q).max(0.0).round() as usize + rng.gen_range(0..2usize)).min(CERTIFICATIONS.len());
    let certifications = CERTIFICATIONS
        .choose_multiple(rng, k)
        .map(|s| s.to_string())
        .collect();
    EsgProfile {
        certifications,
        controversy_count: rng.gen_bool(0.95).then(|| if q < -1.0 { rng.gen_range(0..4) } else { rng.gen_range(0..2) }),
        governance_transparent: rng.gen_bool(0.9).then(|| rng.gen_bool((0.7 + 0.15 * q).clamp(0.05, 0.99))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_portfolio() {
        let a = generate_portfolio(25, 7).unwrap();
        let b = generate_portfolio(25, 7).unwrap();
        assert_eq!(a, b);
        let c = generate_portfolio(25, 8).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn generated_records_are_well_formed() {
        for cp in generate_portfolio(200, 42).unwrap() {
            assert!(cp.ead.is_finite() && cp.ead > 0.0);
            assert_eq!(cp.ead.fract(), 0.0, "exposures are whole currency units");
            let s = &cp.financial.statement;
            assert!(s.current_liabilities.unwrap() > 0.0);
            assert!(s.debt_service.unwrap() > 0.0);
            assert!(s.revenue_ttm.unwrap() > 0.0);
            assert!(cp.financial.bank.tx_out_count.unwrap() > 0);
            for inv in &cp.invoices {
                assert!(inv.amount > 0.0);
                assert!(inv.due_date >= inv.issue_date);
                if let Some(p) = inv.paid_date {
                    assert!(p >= inv.issue_date);
                }
            }
            let loss = cp.trade.flow.loss_ratio.unwrap();
            assert!((0.0..=1.0).contains(&loss));
        }
    }

    #[test]
    fn zero_count_is_rejected() {
        assert!(generate_portfolio(0, 1).is_err());
    }

    #[test]
    fn demo_counterparty_round_trips_through_json() {
        let cp = demo_counterparty();
        let text = serde_json::to_string(&cp).unwrap();
        let back: Counterparty = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cp);
    }
}
