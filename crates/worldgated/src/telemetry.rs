//! Structured logging for the gateway process.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};

use worldgate_config::{LogFormat, LoggingConfig};

static SUBSCRIBER: OnceCell<()> = OnceCell::new();

/// Proof that the global subscriber is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another global subscriber was already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on first use.
///
/// Later calls return a handle without reinstalling anything, so command
/// line overrides must be folded into `config` before the first call.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable directive and
/// [`TelemetryError::Subscriber`] when a foreign subscriber is in place.
pub fn initialise(config: &LoggingConfig) -> Result<TelemetryHandle, TelemetryError> {
    SUBSCRIBER
        .get_or_try_init(|| install(config))
        .map(|()| TelemetryHandle)
}

fn install(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
