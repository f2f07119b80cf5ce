//! Core traits for implementing sync destinations.
//!
//! This module defines the traits that sit between the host and a destination:
//! - [`SyncDestinationPlugin`] - Plugin metadata, configuration and the factory
//!   that produces a connected destination
//! - [`SyncDestination`] - A connected destination receiving change events
//! - [`ServerContext`] - Services the host exposes to the plugin

use crate::config::{ConfigArgument, DestinationConfig};
use crate::error::DestinationResult;
use crate::types::{ChangeEvent, LogSeverity};

/// Services provided by the host server to a plugin.
pub trait ServerContext {
    /// Write a message to the host's log at the given severity.
    fn log_message(&self, severity: LogSeverity, message: &str);
}

/// A connected destination.
///
/// **Lifecycle**: a destination is produced once by
/// [`SyncDestinationPlugin::initialize`], receives any number of
/// [`publish`](SyncDestination::publish) calls and is released with
/// [`finalize`](SyncDestination::finalize).
///
/// **Concurrency**: the host may call `publish` from several threads at once,
/// so implementations must only read shared state there. `finalize` takes
/// `&mut self` and therefore never overlaps with a publish.
pub trait SyncDestination: Send + Sync {
    /// Deliver a single change to the destination.
    ///
    /// Called once per observed change regardless of its kind. Implementations
    /// must not retry internally: the host owns the retry policy and uses
    /// [`DestinationError::is_retryable`](crate::DestinationError::is_retryable)
    /// to apply it.
    ///
    /// # Errors
    ///
    /// Returns an error if the change could not be delivered.
    fn publish(&self, change: &ChangeEvent) -> DestinationResult<()>;

    /// Release any connection held by the destination.
    ///
    /// Must be idempotent and must not fail.
    fn finalize(&mut self);

    /// A URL distinguishing this instance from others of the same plugin, if
    /// the destination is connected.
    fn current_endpoint_url(&self) -> Option<String> {
        None
    }
}

/// The main plugin trait: metadata, configuration and construction.
///
/// # Example
///
/// ```rust
/// # use sync_destination_protocol::{
/// #     ChangeEvent, ConfigArgument, DestinationConfig, DestinationResult, ServerContext,
/// #     SyncDestination, SyncDestinationPlugin,
/// # };
/// pub struct StdoutDestination;
///
/// impl SyncDestination for StdoutDestination {
///     fn publish(&self, change: &ChangeEvent) -> DestinationResult<()> {
///         println!("{} {}", change.kind, change.dn());
///         Ok(())
///     }
///
///     fn finalize(&mut self) {}
/// }
///
/// pub struct StdoutPlugin;
///
/// impl SyncDestinationPlugin for StdoutPlugin {
///     type Destination = StdoutDestination;
///
///     fn name(&self) -> &str {
///         "Stdout Sync Destination"
///     }
///
///     fn key(&self) -> &str {
///         "stdout"
///     }
///
///     fn description(&self) -> Vec<String> {
///         vec!["Prints every change it receives.".to_string()]
///     }
///
///     fn config_arguments(&self) -> Vec<ConfigArgument> {
///         Vec::new()
///     }
///
///     fn initialize(
///         &self,
///         _context: &dyn ServerContext,
///         config: &DestinationConfig,
///     ) -> DestinationResult<StdoutDestination> {
///         config.validate(&self.config_arguments())?;
///         Ok(StdoutDestination)
///     }
/// }
/// ```
pub trait SyncDestinationPlugin: Send + Sync {
    /// The connected destination produced by [`initialize`](Self::initialize).
    type Destination: SyncDestination;

    /// Human-readable name shown by the host in listings and logs.
    fn name(&self) -> &str;

    /// Unique, whitespace-free identifier of the plugin.
    fn key(&self) -> &str;

    /// Description of what the plugin does, one paragraph per element.
    fn description(&self) -> Vec<String>;

    /// The configuration arguments this plugin understands.
    fn config_arguments(&self) -> Vec<ConfigArgument>;

    /// Validate `config` and connect.
    ///
    /// This is only called when the plugin is enabled. A failure here is fatal
    /// for the enable sequence and is never retried by the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the destination
    /// cannot be reached.
    fn initialize(
        &self,
        context: &dyn ServerContext,
        config: &DestinationConfig,
    ) -> DestinationResult<Self::Destination>;
}
