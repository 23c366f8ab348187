//! Gateway errors
//!
//! Neither variant is fatal: the gateway always returns a page (empty on
//! failure) alongside the error, and never caches a failed request.

use thiserror::Error;

use crate::normalize::NormalizeError;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failures reported by a transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Remote unreachable, timed out or connection dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Remote answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not valid JSON
    #[error("Invalid JSON payload: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::InvalidUrl { .. } => "TRANSPORT_INVALID_URL",
            TransportError::Network(_) => "TRANSPORT_NETWORK",
            TransportError::Status { .. } => "TRANSPORT_STATUS",
            TransportError::Decode(_) => "TRANSPORT_DECODE",
        }
    }

    /// HTTP status, if the remote answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message fit for showing to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            TransportError::Network(_) => "Network Error - Please check your connection",
            TransportError::Status { status, .. } => match status {
                400 => "Bad Request",
                401 => "Unauthorized",
                403 => "Forbidden",
                404 => "Not Found",
                500 => "Internal Server Error",
                _ => UNEXPECTED,
            },
            TransportError::InvalidUrl { .. } | TransportError::Decode(_) => UNEXPECTED,
        }
    }
}

const UNEXPECTED: &str = "An unexpected error occurred";

/// Errors surfaced in a `QueryOutcome`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Remote call rejected or unreachable
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Payload shape not recognized
    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] NormalizeError),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Transport(err) => err.code(),
            GatewayError::MalformedResponse(err) => err.code(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::Transport(err) => err.user_message(),
            GatewayError::MalformedResponse(_) => UNEXPECTED,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> GatewayError {
        TransportError::Status {
            status,
            body: String::new(),
        }
        .into()
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(status(400).user_message(), "Bad Request");
        assert_eq!(status(401).user_message(), "Unauthorized");
        assert_eq!(status(403).user_message(), "Forbidden");
        assert_eq!(status(404).user_message(), "Not Found");
        assert_eq!(status(500).user_message(), "Internal Server Error");
        assert_eq!(status(502).user_message(), "An unexpected error occurred");
    }

    #[test]
    fn test_network_message() {
        let err = GatewayError::from(TransportError::Network("refused".to_string()));
        assert_eq!(
            err.user_message(),
            "Network Error - Please check your connection"
        );
        assert_eq!(err.code(), "TRANSPORT_NETWORK");
        assert!(err.is_transport());
    }

    #[test]
    fn test_malformed_message() {
        let err = GatewayError::from(NormalizeError::UnexpectedShape {
            found: "string".to_string(),
        });
        assert_eq!(err.user_message(), "An unexpected error occurred");
        assert!(!err.is_transport());
    }
}
