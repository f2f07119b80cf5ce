//! Logging bootstrap and the `tracing`-backed server context.

use crate::traits::ServerContext;
use crate::types::LogSeverity;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "SYNC_DESTINATION_LOG";

/// Install the global `tracing` subscriber.
///
/// The filter is read from [`LOG_ENV`], falling back to `info` (or `debug`
/// when `verbose` is set). Calling this more than once is harmless; only the
/// first subscriber is installed.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    // Err only means a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// A [`ServerContext`] that writes host log messages through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingServerContext;

impl ServerContext for TracingServerContext {
    fn log_message(&self, severity: LogSeverity, message: &str) {
        match severity {
            LogSeverity::Debug => tracing::debug!(?severity, "{message}"),
            LogSeverity::Info => tracing::info!(?severity, "{message}"),
            LogSeverity::MildWarning | LogSeverity::SevereWarning => {
                tracing::warn!(?severity, "{message}");
            }
            LogSeverity::MildError | LogSeverity::SevereError | LogSeverity::FatalError => {
                tracing::error!(?severity, "{message}");
            }
        }
    }
}
