//! Queue resolution and message delivery.
//!
//! [`QueuePublisher`] is the seam between the destination and the messaging
//! service. [`SqsQueueClient`] implements it on top of `aws-sdk-sqs`.

use std::fmt;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client;
use sync_destination_protocol::TransportError;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// A queue resolved from its logical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    name: String,
    url: String,
}

impl QueueHandle {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// The logical queue name from configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The transport address messages are sent to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Failures reported by a [`QueuePublisher`].
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue '{0}' does not exist")]
    NotFound(String),

    #[error("{context}")]
    Transport {
        context: String,
        #[source]
        source: Option<TransportError>,
    },
}

impl QueueError {
    /// A transport failure caused by `source`.
    pub fn transport(context: impl Into<String>, source: impl Into<TransportError>) -> Self {
        Self::Transport {
            context: context.into(),
            source: Some(source.into()),
        }
    }
}

/// Resolves queues and sends payloads to them.
///
/// Every call is blocking and either completes or fails before returning.
/// Implementations never retry.
pub trait QueuePublisher: Send + Sync {
    /// Look up the queue called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotFound`] if no such queue exists.
    fn resolve(&self, name: &str) -> Result<QueueHandle, QueueError>;

    /// Send a single message with `payload` as its body.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Transport`] if the message was not accepted.
    fn send(&self, queue: &QueueHandle, payload: &str) -> Result<(), QueueError>;

    /// Release the underlying client.
    fn shutdown(self: Box<Self>);
}

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// [`QueuePublisher`] backed by Amazon SQS.
///
/// Credentials, region and endpoint come from the ambient AWS environment
/// (environment variables, shared profile, instance or task role). The client
/// owns a small multi-thread runtime, so `send` may be called from any number
/// of host threads at once.
pub struct SqsQueueClient {
    runtime: Runtime,
    client: Client,
}

impl SqsQueueClient {
    /// Build a client from the default AWS configuration chain.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Transport`] if the runtime cannot be started.
    pub fn from_env() -> Result<Self, QueueError> {
        let runtime = start_runtime()?;

        let sdk_config = runtime.block_on(aws_config::load_defaults(BehaviorVersion::latest()));
        debug!(region = ?sdk_config.region(), "loaded AWS configuration");

        Ok(Self {
            client: Client::new(&sdk_config),
            runtime,
        })
    }

    /// Build a client from an explicit service configuration, bypassing the
    /// ambient environment.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Transport`] if the runtime cannot be started.
    pub fn with_config(config: aws_sdk_sqs::Config) -> Result<Self, QueueError> {
        Ok(Self {
            runtime: start_runtime()?,
            client: Client::from_conf(config),
        })
    }
}

fn start_runtime() -> Result<Runtime, QueueError> {
    Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("sqs-destination")
        .enable_all()
        .build()
        .map_err(|err| QueueError::transport("failed to start runtime", err))
}

impl QueuePublisher for SqsQueueClient {
    fn resolve(&self, name: &str) -> Result<QueueHandle, QueueError> {
        let output = self
            .runtime
            .block_on(self.client.get_queue_url().queue_name(name).send())
            .map_err(|err| match err.as_service_error() {
                Some(service_error) if service_error.is_queue_does_not_exist() => {
                    QueueError::NotFound(name.to_string())
                }
                _ => QueueError::transport(format!("GetQueueUrl failed for '{name}'"), err),
            })?;

        let url = output.queue_url().ok_or_else(|| QueueError::Transport {
            context: format!("GetQueueUrl returned no URL for '{name}'"),
            source: None,
        })?;

        Ok(QueueHandle::new(name, url))
    }

    fn send(&self, queue: &QueueHandle, payload: &str) -> Result<(), QueueError> {
        let output = self
            .runtime
            .block_on(
                self.client
                    .send_message()
                    .queue_url(queue.url())
                    .message_body(payload)
                    .send(),
            )
            .map_err(|err| {
                QueueError::transport(format!("SendMessage to '{}' failed", queue.name()), err)
            })?;

        debug!(
            queue = queue.name(),
            message_id = output.message_id().unwrap_or_default(),
            "message sent"
        );
        Ok(())
    }

    fn shutdown(self: Box<Self>) {
        let Self { runtime, client } = *self;
        drop(client);
        runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    }
}
