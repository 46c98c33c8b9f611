//! Sample data: the worked-example counterparty and seeded synthetic portfolios.

pub mod sample;

pub use sample::*;
