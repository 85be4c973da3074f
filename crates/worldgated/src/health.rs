//! Lifecycle events surfaced to operators.

use std::net::SocketAddr;
use std::sync::Arc;

use worldgate_config::Config;

use crate::bootstrap::BootstrapError;

pub(crate) const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer notified at each gateway lifecycle transition.
pub trait HealthReporter: Send + Sync {
    /// Configuration loading is about to begin.
    fn bootstrap_starting(&self);

    /// Configuration and telemetry are ready.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Bootstrap aborted.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// The listener is accepting connections.
    fn gateway_listening(&self, address: SocketAddr);

    /// The listener and executor have stopped.
    fn gateway_stopped(&self, abandoned_sessions: usize);

    /// A new token replaced the old one.
    fn token_regenerated(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn gateway_listening(&self, address: SocketAddr) {
        (**self).gateway_listening(address);
    }

    fn gateway_stopped(&self, abandoned_sessions: usize) {
        (**self).gateway_stopped(abandoned_sessions);
    }

    fn token_regenerated(&self) {
        (**self).token_regenerated();
    }
}

/// Reporter that writes each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "loading gateway configuration"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            address = %config.bind_address(),
            max_connections = config.max_connections,
            require_token = config.require_token,
            log_format = %config.log_format,
            "gateway bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "gateway bootstrap failed"
        );
    }

    fn gateway_listening(&self, address: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "gateway_listening",
            address = %address,
            "gateway listening"
        );
    }

    fn gateway_stopped(&self, abandoned_sessions: usize) {
        if abandoned_sessions == 0 {
            tracing::info!(
                target: HEALTH_TARGET,
                event = "gateway_stopped",
                "gateway stopped"
            );
        } else {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "gateway_stopped",
                abandoned_sessions,
                "gateway stopped with sessions still running"
            );
        }
    }

    fn token_regenerated(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "token_regenerated",
            "gateway token regenerated"
        );
    }
}
