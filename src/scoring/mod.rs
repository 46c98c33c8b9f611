//! Aggregation of category features into a risk report.

pub mod aggregate;

pub use aggregate::{apply_override, evaluate_risk};
