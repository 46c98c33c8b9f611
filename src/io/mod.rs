//! Input/output helpers.
//!
//! - counterparty JSON + invoice CSV ingest (`ingest`)
//! - report JSON and batch CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
