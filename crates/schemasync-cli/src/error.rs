//! CLI error type.

use thiserror::Error;

/// Errors that end a command with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] schemasync_client::Error),

    #[error(transparent)]
    Sync(#[from] schemasync_sync::SyncError),

    #[error("failed to encode plan: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} operation(s) failed")]
    OperationsFailed(usize),
}
