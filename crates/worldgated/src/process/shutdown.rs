//! Operating-system stop requests.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Blocks until the process should stop.
pub trait ShutdownSignal: Send + 'static {
    /// Waits for the stop request.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when handlers cannot be installed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors raised while waiting for a stop request.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Signal handlers could not be registered.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Registration error.
        #[source]
        source: io::Error,
    },
}

/// Waits for SIGTERM, SIGINT, SIGQUIT, or SIGHUP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            info!(target: PROCESS_TARGET, signal, "termination signal received");
        }
        Ok(())
    }
}
