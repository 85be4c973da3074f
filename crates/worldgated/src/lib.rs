//! Remote command gateway to a single-writer simulated world.
//!
//! Clients open a TCP connection, send one JSON request line carrying a
//! token, an action, and parameters, and receive one JSON response line. The
//! world itself may only be touched from one simulation thread, so every
//! session funnels its command through the [`SimulationExecutor`] and blocks
//! until the simulation thread has run it.
//!
//! The moving parts:
//!
//! - [`TokenAuthenticator`] checks the shared-secret token in constant time
//!   and rotates it on request.
//! - [`CommandRegistry`] maps action names to parameter requirements and
//!   command functions, validates requests, and contains command faults.
//! - [`SimulationExecutor`] owns the world on a dedicated thread and runs
//!   submitted work strictly in submission order.
//! - The transport accepts connections and hands each one to a fixed pool of
//!   session workers; accepting pauses while every worker is busy.
//! - [`Gateway`] composes the above and exposes start, stop, status, reload,
//!   and token management, which the [`AdminShell`] surfaces to operators.
//!
//! [`MemoryWorld`] is the in-memory [`World`] the daemon serves by default.

mod admin;
mod auth;
mod bootstrap;
mod executor;
mod gateway;
mod health;
mod process;
mod registry;
mod session;
mod telemetry;
mod transport;
mod world;

pub use admin::{ADMIN_PERMISSION, AdminOutcome, AdminShell, CommandSender, ConsoleSender};
pub use auth::{AuthError, ConfigTokenStore, TokenAuthenticator, TokenStore, generate_token};
pub use bootstrap::{
    BootstrapError, Bootstrapped, ConfigLoader, FileConfigLoader, StaticConfigLoader,
    bootstrap_with,
};
pub use executor::{ExecutorError, ExecutorSettings, SimulationExecutor};
pub use gateway::{Gateway, GatewayContext, GatewayError, GatewayStatus, ReloadOutcome};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    AdminConsole, LaunchError, LaunchOptions, ShutdownError, ShutdownSignal, StopReason,
    SystemShutdownSignal, run_gateway,
};
pub use registry::{
    Arguments, CommandError, CommandFn, CommandRegistry, CommandResult, CommandSpec, ParamKind,
    ParamSpec,
};
pub use session::{LogSwitches, SessionError};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;
pub use world::{
    Block, BlockPos, DAY_LENGTH, Entity, EntityKind, GameMode, ItemStack, Location, Material,
    MemoryWorld, Player, Weather, World,
};

#[cfg(test)]
mod tests;
