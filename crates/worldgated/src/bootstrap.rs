//! Configuration loading and telemetry start-up.

use std::ffi::OsString;
use std::sync::Arc;

use thiserror::Error;

use worldgate_config::{Config, ConfigError, ConfigFile};

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of gateway configuration.
pub trait ConfigLoader: Send + Sync {
    /// Produces validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the underlying configuration error.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Layers command line flags and `WORLDGATE_*` variables over a TOML file,
/// writing the defaults first when the file does not exist.
#[derive(Debug, Clone)]
pub struct FileConfigLoader {
    file: ConfigFile,
    flags: Vec<OsString>,
}

impl FileConfigLoader {
    /// Builds a loader for `file` with no flag overrides.
    #[must_use]
    pub const fn new(file: ConfigFile) -> Self {
        Self {
            file,
            flags: Vec::new(),
        }
    }

    /// Sets the flags layered over the file and environment, such as
    /// `--port 4000`.
    #[must_use]
    pub fn with_flags(mut self, flags: Vec<OsString>) -> Self {
        self.flags = flags;
        self
    }

    /// The file being loaded.
    #[must_use]
    pub const fn file(&self) -> &ConfigFile {
        &self.file
    }
}

impl ConfigLoader for FileConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        if self.file.ensure_exists()? {
            tracing::info!(
                target: concat!(env!("CARGO_PKG_NAME"), "::bootstrap"),
                path = %self.file.path().display(),
                "wrote default configuration"
            );
        }
        self.file.load_with_flags(self.flags.iter().cloned())
    }
}

/// Serves a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Builds a loader that always yields `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors that abort bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration could not be loaded.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Loader error.
        #[source]
        source: ConfigError,
    },
    /// The subscriber could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Configuration plus the telemetry it configured.
#[derive(Debug)]
pub struct Bootstrapped {
    /// Resolved configuration.
    pub config: Config,
    /// Telemetry handle.
    pub telemetry: TelemetryHandle,
}

/// Loads configuration and installs telemetry, reporting each stage.
///
/// # Errors
///
/// Returns [`BootstrapError`] when either stage fails; the reporter has
/// already been told.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &Arc<dyn HealthReporter>,
) -> Result<Bootstrapped, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config.logging()) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    Ok(Bootstrapped { config, telemetry })
}
