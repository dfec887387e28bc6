//! Sync error types.
//!
//! These are cycle-level failures. Rate limiting is absorbed by the retry
//! policy, per-operation failures are collected in an apply report, and
//! unsafe operations are deferred to a migration artifact; none of them
//! surface here.

use std::path::PathBuf;

use schemasync_core::BackendError;
use thiserror::Error;

/// Errors that abort a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The desired schema is malformed. Raised before any backend call.
    #[error("invalid schema: {0}")]
    Validation(#[from] schemasync_core::Error),

    /// No schema document was found under the schema roots.
    #[error("no schema documents found under {}", display_paths(.0))]
    NoSchema(Vec<PathBuf>),

    /// The backend could not be reached, refused the credentials or failed
    /// to report its current schema.
    #[error("backend unavailable: {0}")]
    Connectivity(BackendError),

    /// A local file could not be read or written.
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::NoSchema(vec![PathBuf::from("pb_schema"), PathBuf::from("extra")]);
        assert_eq!(
            err.to_string(),
            "no schema documents found under pb_schema, extra"
        );

        let err = SyncError::Connectivity(BackendError::Unreachable("connection refused".into()));
        assert_eq!(
            err.to_string(),
            "backend unavailable: backend unreachable: connection refused"
        );
    }
}
