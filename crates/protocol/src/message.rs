//! Serializable message types for host/plugin communication.
//!
//! Change events and configuration cross the C ABI as JSON using the serde
//! forms of [`ChangeEvent`](crate::ChangeEvent) and
//! [`DestinationConfig`](crate::DestinationConfig). The outcome of every call
//! goes back to the host as a [`CallResultMessage`].

use crate::error::{error_chain, DestinationResult, ErrorKind};
use serde::{Deserialize, Serialize};

/// Outcome of an initialize or publish call.
///
/// ```rust
/// # use sync_destination_protocol::{CallResultMessage, DestinationError};
/// let ok = CallResultMessage::from(Ok::<(), DestinationError>(()));
/// assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"status":"ok"}"#);
///
/// let failed = CallResultMessage::from(Err::<(), _>(DestinationError::NotInitialized));
/// assert!(!failed.is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallResultMessage {
    Ok,
    Error {
        kind: ErrorKind,
        /// Whether the host may retry the call with the same input.
        retryable: bool,
        message: String,
    },
}

impl CallResultMessage {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<DestinationResult<()>> for CallResultMessage {
    fn from(result: DestinationResult<()>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(error) => Self::Error {
                kind: error.kind(),
                retryable: error.is_retryable(),
                message: error_chain(&error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DestinationError;
    use crate::types::ChangeKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn publish_failure_is_reported_as_retryable() {
        let message = CallResultMessage::from(Err(DestinationError::Publish {
            queue: "directory-changes".to_string(),
            kind: ChangeKind::Create,
            dn: "cn=a".to_string(),
            source: "connection reset".into(),
        }));

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "status": "error",
                "kind": "publish",
                "retryable": true,
                "message": "failed to publish create of 'cn=a' to queue 'directory-changes': connection reset"
            })
        );
    }

    #[test]
    fn missing_queue_is_reported_as_configuration() {
        let message = CallResultMessage::from(Err(DestinationError::QueueNotFound {
            queue: "missing".to_string(),
        }));

        match message {
            CallResultMessage::Error {
                kind, retryable, ..
            } => {
                assert_eq!(kind, ErrorKind::Configuration);
                assert!(!retryable);
            }
            CallResultMessage::Ok => panic!("expected an error"),
        }
    }
}
