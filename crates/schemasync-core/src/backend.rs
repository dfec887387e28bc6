//! Backend collaborator interface.
//!
//! The sync engine never talks to a backend directly; it goes through this
//! trait so the transport (REST client, in-memory fake) stays replaceable.

use crate::migration::MigrationOperation;
use crate::schema::SchemaDefinition;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend asked the caller to slow down.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The backend could not be reached.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Authentication was refused.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend rejected the request.
    #[error("rejected{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Rejected {
        /// HTTP status, when the transport has one.
        status: Option<u16>,
        /// Message reported by the backend.
        message: String,
    },

    /// The backend answered with something that could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Create a rejection without a status code.
    pub fn rejected(message: impl Into<String>) -> Self {
        BackendError::Rejected {
            status: None,
            message: message.into(),
        }
    }

    /// Check if this is a throttling signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BackendError::RateLimited(_))
    }

    /// Check if the backend is unreachable or refused the credentials.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            BackendError::Unreachable(_) | BackendError::Unauthorized(_)
        )
    }
}

/// Capability set required from a backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Establish credentials for subsequent calls.
    async fn authenticate(&self) -> Result<(), BackendError>;

    /// Fetch the backend's current schema, fully populated with ids.
    async fn fetch_current_schema(&self) -> Result<SchemaDefinition, BackendError>;

    /// Apply a single operation.
    async fn apply_operation(&self, operation: &MigrationOperation) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(BackendError::RateLimited("slow down".into()).is_rate_limited());
        assert!(BackendError::Unreachable("refused".into()).is_connectivity());
        assert!(BackendError::Unauthorized("bad token".into()).is_connectivity());
        assert!(!BackendError::rejected("invalid").is_connectivity());
        assert!(!BackendError::rejected("invalid").is_rate_limited());
    }

    #[test]
    fn test_rejected_display() {
        let err = BackendError::Rejected {
            status: Some(400),
            message: "name: must be unique".into(),
        };
        assert_eq!(err.to_string(), "rejected (400): name: must be unique");
        assert_eq!(
            BackendError::rejected("boom").to_string(),
            "rejected: boom"
        );
    }
}
