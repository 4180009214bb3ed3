//! Error types for the agent contract

use thiserror::Error;

use crate::envelope::EnvelopeKind;
use crate::schema::ValidationReport;

/// Errors raised by contract operations that can fail.
///
/// Plain schema validation never produces one of these; it returns a
/// [`ValidationReport`]. `Invalid` is how the report travels when a caller
/// asked for a typed envelope and the payload was rejected.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("envelope rejected: {0}")]
    Invalid(ValidationReport),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a {expected} envelope, found {found}")]
    KindMismatch {
        expected: EnvelopeKind,
        found: EnvelopeKind,
    },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("schema document error: {0}")]
    Schema(String),

    #[error("API description error: {0}")]
    Api(String),
}

impl ContractError {
    /// The validation report, when the error came from a schema rejection
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ContractError::Invalid(report) => Some(report),
            _ => None,
        }
    }
}
