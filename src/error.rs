//! Error types.
//!
//! The library reports failures as [`RiskError`]; the `rift` binary converts
//! them into [`AppError`], which carries a process exit code.
//!
//! Degraded (but non-fatal) inputs are not errors: they travel alongside
//! results as [`DegradedInputWarning`] values and end up in the report.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Library error taxonomy.
///
/// Every variant names the offending field(s) so a caller can correct the
/// source record without guessing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// A required input is missing or structurally invalid.
    #[error("validation failed for {}: {reason}", fields.join(", "))]
    Validation { fields: Vec<String>, reason: String },

    /// Input is present but malformed (e.g. a due date before its issue date).
    #[error("malformed data in {field}: {reason}")]
    Data { field: String, reason: String },

    /// The weight configuration itself is unusable.
    #[error("invalid weight config at {field}: {reason}")]
    Config { field: String, reason: String },

    /// A PD model failed to produce an estimate.
    #[error("PD model '{model}' failed: {reason}")]
    Model { model: String, reason: String },
}

impl RiskError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskError::Validation {
            fields: vec![field.into()],
            reason: reason.into(),
        }
    }

    /// One error listing every absent required field.
    pub fn missing(fields: Vec<String>) -> Self {
        RiskError::Validation {
            fields,
            reason: "required field is absent".to_string(),
        }
    }

    pub fn data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskError::Data {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskError::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn model(model: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskError::Model {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Field names implicated by this error.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            RiskError::Validation { fields, .. } => fields.iter().map(String::as_str).collect(),
            RiskError::Data { field, .. } | RiskError::Config { field, .. } => vec![field.as_str()],
            RiskError::Model { .. } => Vec::new(),
        }
    }
}

/// Optional data was missing or a low-confidence substitute was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedInputWarning {
    pub field: String,
    pub message: String,
}

impl DegradedInputWarning {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DegradedInputWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<RiskError> for AppError {
    fn from(err: RiskError) -> Self {
        let exit_code = match &err {
            RiskError::Config { .. } => 2,
            RiskError::Validation { .. } => 3,
            RiskError::Data { .. } => 4,
            RiskError::Model { .. } => 5,
        };
        AppError::new(exit_code, err.to_string())
    }
}
