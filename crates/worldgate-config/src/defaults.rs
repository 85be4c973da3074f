use std::path::PathBuf;

/// Default bind address for the command listener.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default TCP port for the command listener.
pub const DEFAULT_PORT: u16 = 65535;

/// Default size of the session worker pool.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Environment variable naming the configuration file, read by the layered
/// loader and by the daemon's `--config-path` flag.
pub const CONFIG_PATH_ENV_VAR: &str = "WORLDGATE_CONFIG_PATH";

pub(crate) const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;
pub(crate) const DEFAULT_TICK_INTERVAL_MS: u64 = 50;
pub(crate) const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;
pub(crate) const DEFAULT_SPAWN: [f64; 3] = [0.0, 64.0, 0.0];

/// Configuration file location when neither `--config-path` nor
/// `WORLDGATE_CONFIG_PATH` names one: under the platform configuration
/// directory, falling back to the working directory.
#[must_use]
pub fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(mut dir) => {
            dir.push("worldgate");
            dir.push("worldgate.toml");
            dir
        }
        None => PathBuf::from("worldgate.toml"),
    }
}
