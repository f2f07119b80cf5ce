//! Destination error types.

use crate::types::ChangeKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed error from the underlying transport.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Render `error` followed by each error in its source chain, separated by `: `.
#[must_use]
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Result type for destination operations.
pub type DestinationResult<T> = Result<T, DestinationError>;

/// Errors a destination reports back to the host.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("queue '{queue}' does not exist")]
    QueueNotFound { queue: String },

    #[error("failed to resolve queue '{queue}'")]
    QueueResolution {
        queue: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to publish {kind} of '{dn}' to queue '{queue}'")]
    Publish {
        queue: String,
        kind: ChangeKind,
        dn: String,
        #[source]
        source: TransportError,
    },

    #[error("cannot project entry '{dn}': attribute '{attribute}' has no values")]
    Projection { dn: String, attribute: String },

    #[error("destination is not initialized")]
    NotInitialized,

    #[error("destination is already initialized")]
    AlreadyInitialized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of a [`DestinationError`], as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Publish,
    Projection,
    NotInitialized,
    InvalidRequest,
}

impl DestinationError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_)
            | Self::QueueNotFound { .. }
            | Self::QueueResolution { .. }
            | Self::AlreadyInitialized => ErrorKind::Configuration,
            Self::Publish { .. } => ErrorKind::Publish,
            Self::Projection { .. } => ErrorKind::Projection,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::InvalidRequest(_) | Self::Serialization(_) => ErrorKind::InvalidRequest,
        }
    }

    /// Returns true if the host may retry the failed call with the same input.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Publish { .. })
    }

    /// Returns true if the error must abort the host's enable sequence.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
