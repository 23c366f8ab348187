//! Query construction errors
//!
//! These are caller-side programming errors. They are returned when a
//! `QueryState` is built and never travel through the async pipeline.

use thiserror::Error;

/// Result type for query construction
pub type QueryResult<T> = Result<T, QueryError>;

/// Invalid query errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Page size must be positive
    #[error("Invalid page size {0}: size must be greater than zero")]
    InvalidSize(usize),

    /// Filter operator is not one of the supported names
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    /// Sort expression could not be parsed
    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    /// Filter criterion has an unsupported shape
    #[error("Invalid filter for field '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },
}

impl QueryError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidSize(_) => "INVALID_SIZE",
            QueryError::UnknownOperator(_) => "UNKNOWN_OPERATOR",
            QueryError::InvalidSort(_) => "INVALID_SORT",
            QueryError::InvalidFilter { .. } => "INVALID_FILTER",
        }
    }
}
