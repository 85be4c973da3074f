//! Argument parsing for the `worldgate` binary.

use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use worldgate_protocol::Params;

use crate::client::{Client, DEFAULT_HOST, DEFAULT_PORT};

/// Sends one command to a worldgate gateway and prints its result.
#[derive(Debug, Parser)]
#[command(name = "worldgate", version, about)]
pub(crate) struct Cli {
    /// Gateway host.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub(crate) host: String,
    /// Gateway port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub(crate) port: u16,
    /// Shared-secret token.
    #[arg(long, env = "WORLDGATE_TOKEN", default_value = "", hide_env_values = true)]
    pub(crate) token: String,
    /// Connect and read timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub(crate) timeout: u64,
    /// Command name, for example `setblock`.
    pub(crate) action: String,
    /// Parameters as `key=value`; values are read as JSON when they parse.
    #[arg(value_parser = parse_param)]
    pub(crate) params: Vec<(String, Value)>,
}

impl Cli {
    pub(crate) fn client(&self) -> Client {
        Client::new(self.host.as_str(), self.port, self.token.as_str())
            .with_timeout(Duration::from_secs(self.timeout))
    }

    pub(crate) fn params(&self) -> Params {
        self.params.iter().cloned().collect()
    }
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected key=value, got '{raw}'"));
    };
    if key.is_empty() {
        return Err(format!("parameter name missing in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}
