//! Shared configuration for the worldgate daemon and its tooling.
//!
//! Values are layered with `ortho_config`: built-in defaults, then the TOML
//! file, then `WORLDGATE_*` environment variables, then command line flags.
//! Keys are snake_case and every key has a matching variable and flag:
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 65535          # WORLDGATE_PORT, --port
//! max_connections = 10  # WORLDGATE_MAX_CONNECTIONS, --max-connections
//! token = ""
//! require_token = true
//! log_filter = "info"
//! ```
//!
//! The daemon owns the file: it writes the defaults on first start and
//! rewrites `token` whenever the token is generated or rotated, so
//! [`ConfigFile`] exposes both read and atomic write paths.

mod defaults;
mod file;
mod settings;

pub use defaults::{
    CONFIG_PATH_ENV_VAR, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT,
    default_config_path,
};
pub use file::{ConfigError, ConfigFile};
pub use settings::{
    Config, ExecutorConfig, LogFormat, LoggingConfig, ServerConfig, SpawnPoint,
    SpawnPointParseError, WorldConfig,
};
