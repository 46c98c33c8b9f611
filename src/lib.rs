//! `rift-score` library crate.
//!
//! The binary (`rift`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the scoring engine can be embedded in a service that owns its own I/O
//! - code stays easy to navigate as the project grows
//!
//! The engine itself is `features` (one extractor per category), `models`
//! (PD estimation) and `scoring` (aggregation), all driven by an explicit,
//! versioned `config::WeightConfig`.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod scoring;
