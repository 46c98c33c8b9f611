//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs the log subscriber
//! - parses CLI arguments
//! - resolves the weight config
//! - loads or generates counterparties
//! - runs the scoring pipeline
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{BatchArgs, Command, ConfigFormat, ScoreArgs, WeightsArgs};
use crate::config::{WeightConfig, load_weight_config};
use crate::error::AppError;

pub mod pipeline;

/// Environment variable holding the log filter (`RIFT_LOG=debug`, `RIFT_LOG=rift_score=trace`).
pub const LOG_ENV: &str = "RIFT_LOG";

/// Entry point for the `rift` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Score(args) => handle_score(args),
        Command::Batch(args) => handle_batch(args),
        Command::Weights(args) => handle_weights(args),
    }
}

/// Logs go to stderr so stdout stays clean for reports and JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = load_weight_config(args.weights.as_deref())?;

    let mut counterparty = match &args.input {
        Some(path) => crate::io::load_counterparty(path)?,
        None => {
            info!("no --input given; scoring the built-in worked example");
            crate::data::demo_counterparty()
        }
    };
    if let Some(path) = &args.invoices {
        counterparty.invoices = crate::io::load_invoices(path)?;
        debug!(count = counterparty.invoices.len(), "invoices loaded from ledger");
    }
    if let Some(asof) = args.asof {
        counterparty.asof = asof;
    }

    let model = pipeline::build_pd_model(args.pd_model, &config);
    let report = pipeline::assess(&counterparty, &config, &model)?;

    if args.json {
        println!("{}", crate::io::report_to_json(&report)?);
    } else {
        println!("{}", crate::report::format_report(&counterparty.id, &report));
    }

    if let Some(path) = &args.export {
        crate::io::write_report_json(path, &report)?;
        info!(path = %path.display(), "report exported");
    }
    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = load_weight_config(args.weights.as_deref())?;
    let portfolio = crate::data::generate_portfolio(args.sample_count, args.seed)?;
    let model = pipeline::build_pd_model(args.pd_model, &config);

    let batch = pipeline::assess_batch(&portfolio, &config, &model);
    info!(
        scored = batch.assessments.len(),
        rejected = batch.failures.len(),
        "batch complete"
    );

    println!(
        "{}",
        crate::report::format_batch_summary(&batch, &config, args.sample_count, args.seed)
    );
    let rankings = crate::report::rank_portfolio(&batch.assessments, args.top);
    println!("{}", crate::report::format_rankings(&rankings));

    if let Some(path) = &args.export {
        crate::io::write_results_csv(path, &batch.assessments)?;
        info!(path = %path.display(), rows = batch.assessments.len(), "results exported");
    }
    Ok(())
}

fn handle_weights(args: WeightsArgs) -> Result<(), AppError> {
    if let Some(path) = &args.check {
        let config = WeightConfig::from_path(path)?;
        println!(
            "{}: ok ({} {}, {} grade bands)",
            path.display(),
            config.name,
            config.version,
            config.grades.len()
        );
        return Ok(());
    }

    let config = WeightConfig::default();
    let text = match args.format {
        ConfigFormat::Toml => config.to_toml_string()?,
        ConfigFormat::Json => config.to_json_string()?,
    };
    println!("{text}");
    Ok(())
}
