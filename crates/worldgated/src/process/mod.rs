//! Process supervision for the `worldgated` binary: launch, console, signals.

mod console;
mod errors;
mod launch;
mod shutdown;

pub use console::AdminConsole;
pub use errors::LaunchError;
pub use launch::{LaunchOptions, run_gateway};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

#[cfg(test)]
pub(crate) use launch::{LaunchPlan, run_gateway_with};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Why the process is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A termination signal arrived.
    Signal,
    /// The operator typed `stop` on the console.
    Console,
}
