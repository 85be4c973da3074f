//! Errors surfaced while launching or supervising the gateway process.

use std::io;

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::gateway::GatewayError;

use super::shutdown::ShutdownError;

/// Failure of the gateway process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration or telemetry failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The gateway failed to build, start, or stop.
    #[error("gateway failure: {0}")]
    Gateway(#[from] GatewayError),
    /// Waiting for termination signals failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// A supervision thread could not be started.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        /// Thread role.
        role: &'static str,
        /// Spawn error.
        #[source]
        source: io::Error,
    },
}
