//! Mathematical utilities: normalisation rules and descriptive statistics.

pub mod normalise;
pub mod stats;

pub use normalise::*;
pub use stats::*;
