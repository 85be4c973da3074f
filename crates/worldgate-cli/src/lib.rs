//! Client for the worldgate command gateway.
//!
//! [`Client`] opens one TCP connection per request, writes the request as a
//! single JSON line, and reads the single response line back. Typed helpers
//! wrap each built-in command. [`run`] drives the `worldgate` binary.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod client;
mod errors;

#[cfg(test)]
mod tests;

pub use client::{Client, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use errors::ClientError;

use cli::Cli;

/// Runs the CLI using the provided arguments and IO handles.
///
/// On success the response `data` is printed to `stdout` as JSON. Usage and
/// request errors go to `stderr` with a failure exit code.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let _ = write!(stderr, "{error}");
            return ExitCode::from(2);
        }
    };
    match cli.client().send(&cli.action, cli.params()) {
        Ok(data) => {
            let _ = writeln!(stdout, "{data}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "worldgate: {error}");
            ExitCode::FAILURE
        }
    }
}
