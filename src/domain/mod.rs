//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw counterparty records (`RegistryFlags`, `FinancialStatement`, `Invoice`, ...)
//! - the extractor output container (`FeatureVector`)
//! - report types (`RiskReport`, `CategoryBreakdown`, ...)

pub mod types;

pub use types::*;
