//! Feature extractors, one per risk category.
//!
//! Each extractor is a pure function of its structured input record and the
//! matching rule block of the weight config. It returns a [`FeatureVector`]
//! of raw features plus derived `*_score` components in `[0, 100]`, with any
//! degraded-input warnings attached.
//!
//! [`FeatureVector`]: crate::domain::FeatureVector

pub mod esg;
pub mod financial;
pub mod identity;
pub mod payment;
pub mod trade;

pub use esg::compute_esg_features;
pub use financial::compute_financial_features;
pub use identity::compute_identity_features;
pub use payment::compute_payment_features;
pub use trade::compute_trade_flow_features;
