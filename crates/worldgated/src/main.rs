//! Daemon entrypoint: parses flags and hands over to [`worldgated::run_gateway`].

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use worldgate_config::CONFIG_PATH_ENV_VAR;
use worldgated::{LaunchOptions, run_gateway};

/// Remote command gateway daemon.
///
/// Every configuration key can also be set as a flag after `--config-path`,
/// for example `--port 4000` or `--log-filter debug`; flags win over
/// `WORLDGATE_*` variables, which win over the file.
#[derive(Debug, Parser)]
#[command(name = "worldgated", version, about)]
struct Cli {
    /// Configuration file; created with defaults when missing.
    #[arg(long, value_name = "PATH", env = CONFIG_PATH_ENV_VAR)]
    config_path: Option<PathBuf>,
    /// Configuration overrides such as `--port 4000`.
    #[arg(
        value_name = "FLAGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    flags: Vec<OsString>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = LaunchOptions {
        config_path: cli.config_path,
        flags: cli.flags,
    };
    match run_gateway(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("worldgated: {error}");
            ExitCode::FAILURE
        }
    }
}
