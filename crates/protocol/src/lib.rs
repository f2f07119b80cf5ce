//! Sync Destination Protocol
//!
//! Contract between a directory synchronization host and the destination
//! plugins it loads. The host detects create, modify and delete changes on
//! directory entries and hands each one to a destination, which delivers it
//! somewhere else.
//!
//! ## Modules
//!
//! - [`types`] - Directory entries, attributes and change events
//! - [`traits`] - [`SyncDestinationPlugin`], [`SyncDestination`] and [`ServerContext`]
//! - [`config`] - Configuration argument declarations and host-supplied values
//! - [`error`] - The [`DestinationError`] taxonomy
//! - [`message`] - Call results exchanged over the C ABI
//! - [`dylib`] - The [`export_destination!`] macro
//! - [`logging`] - `tracing` bootstrap and a `tracing`-backed server context

pub mod config;
pub mod dylib;
pub mod error;
pub mod logging;
pub mod message;
pub mod traits;
pub mod types;

pub use config::{ConfigArgument, DestinationConfig};
pub use error::{error_chain, DestinationError, DestinationResult, ErrorKind, TransportError};
pub use logging::{init_logging, TracingServerContext, LOG_ENV};
pub use message::CallResultMessage;
pub use traits::{ServerContext, SyncDestination, SyncDestinationPlugin};
pub use types::{
    Attribute, ChangeEvent, ChangeKind, DirectoryEntry, LogSeverity, Modification,
    ModificationType,
};

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use serde_json;
}
