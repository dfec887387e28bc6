//! Core error types.

use thiserror::Error;

/// Core schemasync errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema document is malformed (missing keys, duplicate names, bad options).
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation could not be replayed onto a schema.
    #[error("replay error: {0}")]
    Replay(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub(crate) fn replay(message: impl Into<String>) -> Self {
        Error::Replay(message.into())
    }
}
