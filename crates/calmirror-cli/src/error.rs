//! Client error types.

use calmirror_providers::ProviderError;
use calmirror_sync::SyncError;
use thiserror::Error;

use crate::secret::SecretError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a `calmirror` invocation with a non-zero exit code.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A `pass::` or `env::` reference could not be resolved.
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),

    /// Provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The sync run aborted.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication required.
    #[error("authentication required: {0}")]
    AuthRequired(String),
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
