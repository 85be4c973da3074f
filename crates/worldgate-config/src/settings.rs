use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_SHUTDOWN_GRACE_MS, DEFAULT_SPAWN, DEFAULT_TICK_INTERVAL_MS,
};
use crate::file::ConfigError;

/// Gateway configuration resolved from defaults, the TOML file,
/// `WORLDGATE_*` environment variables, and command line flags, in that
/// order of increasing precedence.
///
/// Every key maps to an environment variable and a flag by the usual rule:
/// `max_connections` is `WORLDGATE_MAX_CONNECTIONS` and `--max-connections`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WORLDGATE")]
#[serde(default)]
pub struct Config {
    /// Interface the listener binds to.
    pub host: String,
    /// TCP port the listener binds to.
    pub port: u16,
    /// Number of sessions served concurrently.
    pub max_connections: usize,
    /// Per-connection read timeout in milliseconds; zero disables it.
    pub read_timeout_ms: u64,
    /// Shared secret; an empty value is replaced on first start.
    pub token: String,
    /// Whether requests must present the token.
    pub require_token: bool,
    /// Emit one record per dispatched command.
    pub log_commands: bool,
    /// Emit one record per accepted connection.
    pub log_connections: bool,
    /// `tracing` filter directive.
    pub log_filter: String,
    /// Output format for the subscriber.
    pub log_format: LogFormat,
    /// Upper bound on waiting for a command result; zero waits forever.
    pub command_timeout_ms: u64,
    /// Interval between world ticks; zero disables ticking.
    pub tick_interval_ms: u64,
    /// Time allowed for queued commands to drain on shutdown.
    pub shutdown_grace_ms: u64,
    /// Players online when the world starts.
    pub players: Vec<String>,
    /// Position new players appear at.
    pub spawn: SpawnPoint,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            token: String::new(),
            require_token: true,
            log_commands: true,
            log_connections: true,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            command_timeout_ms: 0,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            players: Vec::new(),
            spawn: SpawnPoint::from(DEFAULT_SPAWN),
        }
    }
}

impl Config {
    /// Checks constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::invalid("max_connections", "must be at least 1"));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "must not be empty"));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::invalid("log_filter", "must not be empty"));
        }
        if !self.spawn.is_finite() {
            return Err(ConfigError::invalid("spawn", "must be finite"));
        }
        Ok(())
    }

    /// Renders the `host:port` pair the listener binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        let host = self.host.as_str();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.port)
        } else {
            format!("{host}:{}", self.port)
        }
    }

    /// Listener and session settings.
    #[must_use]
    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            max_connections: self.max_connections,
            read_timeout_ms: self.read_timeout_ms,
        }
    }

    /// Logging switches and subscriber settings.
    #[must_use]
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            log_commands: self.log_commands,
            log_connections: self.log_connections,
            filter: self.log_filter.clone(),
            format: self.log_format,
        }
    }

    /// Simulation thread settings.
    #[must_use]
    pub const fn executor(&self) -> ExecutorConfig {
        ExecutorConfig {
            command_timeout_ms: self.command_timeout_ms,
            tick_interval_ms: self.tick_interval_ms,
            shutdown_grace_ms: self.shutdown_grace_ms,
        }
    }

    /// Seed data for the in-memory world.
    #[must_use]
    pub fn world(&self) -> WorldConfig {
        WorldConfig {
            players: self.players.clone(),
            spawn: self.spawn.into(),
        }
    }
}

/// Listener and session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface the listener binds to.
    pub host: String,
    /// TCP port the listener binds to.
    pub port: u16,
    /// Number of sessions served concurrently.
    pub max_connections: usize,
    /// Per-connection read timeout in milliseconds; zero disables it.
    pub read_timeout_ms: u64,
}

impl ServerConfig {
    /// Returns the read timeout, or `None` when disabled.
    #[must_use]
    pub const fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }
}

/// Logging switches and subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Emit one record per dispatched command.
    pub log_commands: bool,
    /// Emit one record per accepted connection.
    pub log_connections: bool,
    /// `tracing` filter directive.
    pub filter: String,
    /// Output format for the subscriber.
    pub format: LogFormat,
}

/// Subscriber output format, parsed case-insensitively from `--log-format`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// One human-readable line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Simulation thread settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Upper bound on waiting for a command result; zero waits forever.
    pub command_timeout_ms: u64,
    /// Interval between world ticks; zero disables ticking.
    pub tick_interval_ms: u64,
    /// Time allowed for queued commands to drain on shutdown.
    pub shutdown_grace_ms: u64,
}

impl ExecutorConfig {
    /// Returns the command timeout, or `None` to wait indefinitely.
    #[must_use]
    pub const fn command_timeout(&self) -> Option<Duration> {
        millis(self.command_timeout_ms)
    }

    /// Returns the tick interval, or `None` when ticking is disabled.
    #[must_use]
    pub const fn tick_interval(&self) -> Option<Duration> {
        millis(self.tick_interval_ms)
    }

    /// Returns the shutdown grace period.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Seed data for the in-memory world.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    /// Players online when the world starts.
    pub players: Vec<String>,
    /// Position new players appear at.
    pub spawn: [f64; 3],
}

/// World coordinates written as a TOML array and parsed from `x,y,z` on the
/// command line or in `WORLDGATE_SPAWN`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct SpawnPoint {
    /// East-west axis.
    pub x: f64,
    /// Vertical axis.
    pub y: f64,
    /// North-south axis.
    pub z: f64,
}

impl SpawnPoint {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for SpawnPoint {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<SpawnPoint> for [f64; 3] {
    fn from(point: SpawnPoint) -> Self {
        [point.x, point.y, point.z]
    }
}

impl fmt::Display for SpawnPoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Raised when a spawn point is not three comma separated numbers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid spawn point '{input}': expected x,y,z")]
pub struct SpawnPointParseError {
    input: String,
}

impl FromStr for SpawnPoint {
    type Err = SpawnPointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = || SpawnPointParseError {
            input: input.to_owned(),
        };
        let mut axes = input.split(',').map(|axis| axis.trim().parse::<f64>());
        let (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) =
            (axes.next(), axes.next(), axes.next(), axes.next())
        else {
            return Err(error());
        };
        Ok(Self { x, y, z })
    }
}

const fn millis(value: u64) -> Option<Duration> {
    if value == 0 {
        None
    } else {
        Some(Duration::from_millis(value))
    }
}
