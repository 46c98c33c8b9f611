//! PD model implementations.
//!
//! Models sit behind a small trait so the aggregator and pipeline stay
//! independent of any concrete classifier.

pub mod pd;

pub use pd::*;
