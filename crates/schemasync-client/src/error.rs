//! Client error types.

use schemasync_core::BackendError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP client could not be built.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The backend refused a request.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}
