//! Normalization errors
//!
//! A malformed payload is never fatal: the normalizer still returns an
//! empty page and reports one of these alongside it.

use thiserror::Error;

/// Why a payload could not be read as rows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// Neither a bare array nor a `{ data, total }` envelope
    #[error("Unexpected API response format: {found}")]
    UnexpectedShape { found: String },

    /// Looks like an envelope but a member has the wrong type
    #[error("Invalid response envelope: {reason}")]
    InvalidEnvelope { reason: String },
}

impl NormalizeError {
    pub fn code(&self) -> &'static str {
        match self {
            NormalizeError::UnexpectedShape { .. } => "NORMALIZE_UNEXPECTED_SHAPE",
            NormalizeError::InvalidEnvelope { .. } => "NORMALIZE_INVALID_ENVELOPE",
        }
    }
}
