//! Command-line parsing for the `rift` counterparty risk scorer.
//!
//! Argument parsing and command dispatch stay separate from the scoring code;
//! everything here is plain data handed to `app`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::app::pipeline::PdModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rift", version, about = "Counterparty credit risk scoring (score, PD, LGD, expected loss)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Score one counterparty and print its report.
    Score(ScoreArgs),
    /// Score a seeded synthetic portfolio and print riskiest/safest rankings.
    Batch(BatchArgs),
    /// Print the default weight config, or validate a config file.
    Weights(WeightsArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct ScoreArgs {
    /// Counterparty JSON file. Without it, the built-in worked example is scored.
    #[arg(short, long, value_name = "JSON")]
    pub input: Option<PathBuf>,

    /// Invoice ledger CSV; replaces the invoices in the counterparty file.
    #[arg(long, value_name = "CSV")]
    pub invoices: Option<PathBuf>,

    /// Weight config (.toml or .json). Falls back to $RIFT_WEIGHTS, then the default table.
    #[arg(short, long, value_name = "FILE")]
    pub weights: Option<PathBuf>,

    /// Evaluation date (YYYY-MM-DD); overrides the counterparty's `asof`.
    #[arg(long)]
    pub asof: Option<NaiveDate>,

    /// PD estimator.
    #[arg(long, value_enum, default_value_t = PdModelKind::Logistic)]
    pub pd_model: PdModelKind,

    /// Write the report as JSON to this file.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct BatchArgs {
    /// Number of synthetic counterparties to generate.
    #[arg(short = 'n', long, default_value_t = 250)]
    pub sample_count: usize,

    /// Random seed for portfolio generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Weight config (.toml or .json).
    #[arg(short, long, value_name = "FILE")]
    pub weights: Option<PathBuf>,

    /// PD estimator.
    #[arg(long, value_enum, default_value_t = PdModelKind::Logistic)]
    pub pd_model: PdModelKind,

    /// Show top-N riskiest and safest names.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Export per-counterparty results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

#[derive(Debug, Parser, Clone)]
pub struct WeightsArgs {
    /// Output format for the default table.
    #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
    pub format: ConfigFormat,

    /// Validate this config file instead of printing the default.
    #[arg(long, value_name = "FILE")]
    pub check: Option<PathBuf>,
}
