//! Amazon SQS sync destination.
//!
//! Publishes every directory change the host reports to an SQS queue as a flat
//! JSON document (see [`projector`]). Creates, modifies and deletes are
//! published the same way: the full entry is projected each time and any
//! field-level modifications supplied with a modify are ignored.
//!
//! The queue is configured by name with the single `queue` argument and
//! resolved to its URL once, when the destination is initialized. A queue that
//! does not exist aborts initialization.

// `export_destination!` expands to the C ABI, which reads host-owned pointers.
#![allow(unsafe_code)]

pub mod projector;
pub mod publisher;

use sync_destination_protocol::{
    error_chain, export_destination, ChangeEvent, ConfigArgument, DestinationConfig,
    DestinationError, DestinationResult, LogSeverity, ServerContext, SyncDestination,
    SyncDestinationPlugin,
};
use tracing::{debug, error, info};

use crate::projector::project;
use crate::publisher::{QueueError, QueueHandle, QueuePublisher, SqsQueueClient};

/// Name of the configuration argument holding the queue name.
pub const QUEUE_ARGUMENT: &str = "queue";

/// The plugin registered with the host.
pub struct SqsDestinationPlugin;

impl SqsDestinationPlugin {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SqsDestinationPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncDestinationPlugin for SqsDestinationPlugin {
    type Destination = SqsDestination;

    fn name(&self) -> &str {
        "Amazon SQS Sync Destination"
    }

    fn key(&self) -> &str {
        "aws-sqs"
    }

    fn description(&self) -> Vec<String> {
        vec![
            "Publishes every synchronized directory entry as a JSON document to an Amazon \
             Simple Queue Service queue."
                .to_string(),
        ]
    }

    fn config_arguments(&self) -> Vec<ConfigArgument> {
        vec![ConfigArgument::new(QUEUE_ARGUMENT)
            .required()
            .placeholder("{queue name}")
            .description("The name of the SQS queue to publish changes to.")]
    }

    fn initialize(
        &self,
        context: &dyn ServerContext,
        config: &DestinationConfig,
    ) -> DestinationResult<SqsDestination> {
        config.validate(&self.config_arguments())?;
        let queue = config.required_value(QUEUE_ARGUMENT)?;

        let client = SqsQueueClient::from_env().map_err(|err| {
            DestinationError::Configuration(format!("cannot create SQS client: {err}"))
        })?;

        SqsDestination::connect(context, queue, Box::new(client))
    }
}

/// A destination connected to one resolved queue.
pub struct SqsDestination {
    handle: QueueHandle,
    publisher: Option<Box<dyn QueuePublisher>>,
}

impl SqsDestination {
    /// Resolve `queue` through `publisher` and connect to it.
    ///
    /// A failed resolution is logged to the host at fatal severity and the
    /// publisher is shut down before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::QueueNotFound`] if the queue does not exist
    /// and [`DestinationError::QueueResolution`] for any other failure.
    pub fn connect(
        context: &dyn ServerContext,
        queue: &str,
        publisher: Box<dyn QueuePublisher>,
    ) -> DestinationResult<Self> {
        match publisher.resolve(queue) {
            Ok(handle) => {
                info!(queue = handle.name(), url = handle.url(), "connected to queue");
                Ok(Self {
                    handle,
                    publisher: Some(publisher),
                })
            }
            Err(QueueError::NotFound(_)) => {
                error!(queue, "queue does not exist");
                context.log_message(
                    LogSeverity::FatalError,
                    &format!("Queue '{queue}' does not exist, the destination cannot start."),
                );
                publisher.shutdown();
                Err(DestinationError::QueueNotFound {
                    queue: queue.to_string(),
                })
            }
            Err(err) => {
                let detail = error_chain(&err);
                error!(queue, error = %detail, "unable to resolve queue");
                context.log_message(
                    LogSeverity::FatalError,
                    &format!("Unable to resolve queue '{queue}': {detail}"),
                );
                publisher.shutdown();
                Err(DestinationError::QueueResolution {
                    queue: queue.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    #[must_use]
    pub fn queue(&self) -> &QueueHandle {
        &self.handle
    }
}

impl SyncDestination for SqsDestination {
    fn publish(&self, change: &ChangeEvent) -> DestinationResult<()> {
        let publisher = self
            .publisher
            .as_deref()
            .ok_or(DestinationError::NotInitialized)?;

        let Some(document) = project(change.entry.as_ref())? else {
            debug!(kind = %change.kind, "change carries no entry, nothing to publish");
            return Ok(());
        };

        publisher
            .send(&self.handle, &document)
            .map_err(|err| DestinationError::Publish {
                queue: self.handle.name().to_string(),
                kind: change.kind,
                dn: change.dn().to_string(),
                source: Box::new(err),
            })?;

        debug!(
            kind = %change.kind,
            dn = change.dn(),
            queue = self.handle.name(),
            "published change"
        );
        Ok(())
    }

    fn finalize(&mut self) {
        if let Some(publisher) = self.publisher.take() {
            publisher.shutdown();
            info!(queue = self.handle.name(), "disconnected from queue");
        }
    }

    fn current_endpoint_url(&self) -> Option<String> {
        self.publisher
            .as_ref()
            .map(|_| self.handle.url().to_string())
    }
}

export_destination!(SqsDestinationPlugin);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::io;
    use std::sync::{Arc, Mutex};
    use sync_destination_protocol::{DirectoryEntry, Modification, ModificationType};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
        attempts: AtomicUsize,
        failures_remaining: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    impl Recorder {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    struct MockPublisher {
        queues: Vec<&'static str>,
        recorder: Arc<Recorder>,
    }

    impl QueuePublisher for MockPublisher {
        fn resolve(&self, name: &str) -> Result<QueueHandle, QueueError> {
            if self.queues.iter().any(|queue| *queue == name) {
                Ok(QueueHandle::new(
                    name,
                    format!("https://sqs.ap-southeast-2.amazonaws.com/123456789012/{name}"),
                ))
            } else {
                Err(QueueError::NotFound(name.to_string()))
            }
        }

        fn send(&self, _queue: &QueueHandle, payload: &str) -> Result<(), QueueError> {
            self.recorder.attempts.fetch_add(1, Ordering::SeqCst);
            let fail = self
                .recorder
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if fail {
                return Err(QueueError::transport("SendMessage failed", "throttled"));
            }
            self.recorder.sent.lock().unwrap().push(payload.to_string());
            Ok(())
        }

        fn shutdown(self: Box<Self>) {
            self.recorder.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingContext {
        messages: Mutex<Vec<(LogSeverity, String)>>,
    }

    impl ServerContext for RecordingContext {
        fn log_message(&self, severity: LogSeverity, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((severity, message.to_string()));
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn connect(recorder: &Arc<Recorder>) -> SqsDestination {
        let publisher = MockPublisher {
            queues: vec!["directory-changes"],
            recorder: Arc::clone(recorder),
        };
        SqsDestination::connect(
            &RecordingContext::default(),
            "directory-changes",
            Box::new(publisher),
        )
        .unwrap()
    }

    fn jdoe() -> DirectoryEntry {
        DirectoryEntry::new("uid=jdoe,ou=people,dc=example,dc=com")
            .with_attribute("cn", ["John Doe"])
    }

    #[test]
    fn missing_queue_aborts_initialization() {
        let recorder = Arc::new(Recorder::default());
        let context = RecordingContext::default();
        let publisher = MockPublisher {
            queues: vec!["directory-changes"],
            recorder: Arc::clone(&recorder),
        };

        let result = SqsDestination::connect(&context, "no-such-queue", Box::new(publisher));

        let error = result.err().unwrap();
        assert!(matches!(
            error,
            DestinationError::QueueNotFound { ref queue } if queue == "no-such-queue"
        ));
        assert!(error.is_fatal());
        assert!(!error.is_retryable());

        let messages = context.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, LogSeverity::FatalError);
        assert!(messages[0].1.contains("no-such-queue"));
        assert_eq!(recorder.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_queue_is_also_logged_through_tracing() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let publisher = MockPublisher {
            queues: Vec::new(),
            recorder: Arc::default(),
        };

        let result = tracing::subscriber::with_default(subscriber, || {
            SqsDestination::connect(
                &RecordingContext::default(),
                "no-such-queue",
                Box::new(publisher),
            )
        });

        assert!(result.is_err());
        let output = logs.contents();
        assert!(output.contains("ERROR"));
        assert!(output.contains("queue does not exist"));
        assert!(output.contains("no-such-queue"));
    }

    #[test]
    fn publishes_projected_entry() {
        let recorder = Arc::new(Recorder::default());
        let destination = connect(&recorder);

        destination.publish(&ChangeEvent::create(jdoe())).unwrap();

        assert_eq!(
            recorder.sent(),
            vec![r#"{"dn":"uid=jdoe,ou=people,dc=example,dc=com","cn":"John Doe"}"#.to_string()]
        );
    }

    #[test]
    fn every_change_kind_publishes_the_full_entry() {
        let recorder = Arc::new(Recorder::default());
        let destination = connect(&recorder);
        let modification = Modification {
            modification_type: ModificationType::Replace,
            attribute: "cn".to_string(),
            values: vec!["John Doe".to_string()],
        };

        destination.publish(&ChangeEvent::create(jdoe())).unwrap();
        destination
            .publish(&ChangeEvent::modify(jdoe(), vec![modification]))
            .unwrap();
        destination.publish(&ChangeEvent::delete(jdoe())).unwrap();

        let sent = recorder.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|payload| payload == &sent[0]));
    }

    #[test]
    fn send_failure_is_not_retried_and_queue_stays_usable() {
        let recorder = Arc::new(Recorder::default());
        recorder.failures_remaining.store(1, Ordering::SeqCst);
        let destination = connect(&recorder);

        let error = destination
            .publish(&ChangeEvent::modify(jdoe(), Vec::new()))
            .unwrap_err();

        assert!(error.is_retryable());
        let message = error.to_string();
        assert!(message.contains("directory-changes"));
        assert!(message.contains("modify"));
        assert!(message.contains("uid=jdoe,ou=people,dc=example,dc=com"));
        assert_eq!(
            error_chain(&error),
            format!("{message}: SendMessage failed: throttled")
        );
        assert_eq!(recorder.attempts.load(Ordering::SeqCst), 1);
        assert!(recorder.sent().is_empty());

        destination.publish(&ChangeEvent::create(jdoe())).unwrap();

        assert_eq!(recorder.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.sent().len(), 1);
    }

    #[test]
    fn change_without_entry_sends_nothing() {
        let recorder = Arc::new(Recorder::default());
        let destination = connect(&recorder);
        let change = ChangeEvent {
            kind: sync_destination_protocol::ChangeKind::Delete,
            entry: None,
            modifications: Vec::new(),
        };

        destination.publish(&change).unwrap();

        assert_eq!(recorder.attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unprojectable_entry_is_never_sent() {
        let recorder = Arc::new(Recorder::default());
        let destination = connect(&recorder);
        let entry = jdoe().with_attribute("mail", Vec::<String>::new());

        let error = destination.publish(&ChangeEvent::create(entry)).unwrap_err();

        assert!(matches!(error, DestinationError::Projection { .. }));
        assert_eq!(recorder.attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn finalize_releases_publisher_once() {
        let recorder = Arc::new(Recorder::default());
        let mut destination = connect(&recorder);
        assert!(destination.current_endpoint_url().is_some());

        destination.finalize();
        destination.finalize();

        assert_eq!(recorder.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(destination.current_endpoint_url(), None);
        assert!(matches!(
            destination.publish(&ChangeEvent::create(jdoe())),
            Err(DestinationError::NotInitialized)
        ));
    }

    #[test]
    fn endpoint_url_is_resolved_queue_url() {
        let recorder = Arc::new(Recorder::default());
        let destination = connect(&recorder);

        assert_eq!(
            destination.current_endpoint_url().as_deref(),
            Some("https://sqs.ap-southeast-2.amazonaws.com/123456789012/directory-changes")
        );
        assert_eq!(destination.queue().name(), "directory-changes");
    }

    #[test]
    fn concurrent_publishes_share_the_handle() {
        let recorder = Arc::new(Recorder::default());
        let destination = connect(&recorder);

        std::thread::scope(|scope| {
            for thread in 0..8 {
                let destination = &destination;
                scope.spawn(move || {
                    for n in 0..25 {
                        let uid = format!("user{thread}-{n}");
                        let entry = DirectoryEntry::new(format!("uid={uid},dc=example,dc=com"))
                            .with_attribute("uid", [uid]);
                        destination.publish(&ChangeEvent::create(entry)).unwrap();
                    }
                });
            }
        });

        assert_eq!(recorder.sent().len(), 200);
    }

    #[test]
    fn plugin_declares_single_required_queue_argument() {
        let plugin = SqsDestinationPlugin::new();

        let arguments = plugin.config_arguments();

        assert_eq!(plugin.name(), "Amazon SQS Sync Destination");
        assert_eq!(plugin.key(), "aws-sqs");
        assert_eq!(arguments.len(), 1);
        assert_eq!(arguments[0].name, QUEUE_ARGUMENT);
        assert!(arguments[0].required);
        assert_eq!(arguments[0].max_occurrences, 1);
    }

    #[test]
    fn plugin_rejects_missing_queue_before_connecting() {
        let plugin = SqsDestinationPlugin::new();

        let result = plugin.initialize(&RecordingContext::default(), &DestinationConfig::new());

        let error = result.err().unwrap();
        assert!(matches!(error, DestinationError::Configuration(_)));
        assert!(error.is_fatal());
    }
}
