//! Operator command shell: `reload`, `token [regenerate]`, `status`.
//!
//! Every subcommand requires [`ADMIN_PERMISSION`]. Replies go back to the
//! issuing [`CommandSender`] as plain lines.

use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use strum::EnumString;
use tracing::{debug, warn};

use crate::gateway::Gateway;
use crate::world::World;

pub(crate) const ADMIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::admin");

/// Permission required by every admin subcommand.
pub const ADMIN_PERMISSION: &str = "worldgate.admin";

const USAGE: &str = "Usage: worldgate <reload|token|status>";
const DENIED: &str = "You don't have permission to use this command.";

/// Origin of an admin command.
pub trait CommandSender: Send + Sync {
    /// Display name used in logs.
    fn name(&self) -> &str;

    /// Whether the sender holds `permission`.
    fn has_permission(&self, permission: &str) -> bool;

    /// Delivers one reply line.
    fn send_message(&self, message: &str);
}

/// Operator console; holds every permission and writes replies to a sink.
pub struct ConsoleSender {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSender {
    /// Console writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Console writing to `out`.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        "console"
    }

    fn has_permission(&self, _permission: &str) -> bool {
        true
    }

    fn send_message(&self, message: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = writeln!(out, "{message}").and_then(|()| out.flush()) {
            warn!(target: ADMIN_TARGET, error = %error, "failed to write console reply");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Subcommand {
    Reload,
    Token,
    Status,
}

/// Result of running one admin command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    /// The command ran, or was refused for lack of permission.
    Handled,
    /// The command ran and failed.
    Failed,
    /// The subcommand was not recognised.
    Unknown,
}

/// Admin command interpreter bound to one gateway.
pub struct AdminShell<W> {
    gateway: Arc<Gateway<W>>,
}

impl<W: World> AdminShell<W> {
    /// Builds a shell for `gateway`.
    #[must_use]
    pub const fn new(gateway: Arc<Gateway<W>>) -> Self {
        Self { gateway }
    }

    /// Runs one command given its whitespace-split arguments.
    pub fn execute(&self, sender: &dyn CommandSender, args: &[&str]) -> AdminOutcome {
        let Some((first, rest)) = args.split_first() else {
            sender.send_message(&format!("worldgate v{}", env!("CARGO_PKG_VERSION")));
            sender.send_message(USAGE);
            return AdminOutcome::Handled;
        };
        let Ok(subcommand) = Subcommand::from_str(first) else {
            sender.send_message(&format!("Unknown subcommand: {}", first.to_lowercase()));
            return AdminOutcome::Unknown;
        };
        if !sender.has_permission(ADMIN_PERMISSION) {
            debug!(
                target: ADMIN_TARGET,
                sender = sender.name(),
                ?subcommand,
                "admin command refused"
            );
            sender.send_message(DENIED);
            return AdminOutcome::Handled;
        }
        debug!(target: ADMIN_TARGET, sender = sender.name(), ?subcommand, "admin command");
        match subcommand {
            Subcommand::Reload => self.reload(sender),
            Subcommand::Token => self.token(sender, rest),
            Subcommand::Status => self.status(sender),
        }
    }

    fn reload(&self, sender: &dyn CommandSender) -> AdminOutcome {
        match self.gateway.reload() {
            Ok(outcome) => {
                sender.send_message("Configuration reloaded successfully!");
                if outcome.restart_required {
                    sender.send_message("Server settings changed; restart to apply them.");
                }
                AdminOutcome::Handled
            }
            Err(error) => {
                sender.send_message(&format!("Failed to reload configuration: {error}"));
                AdminOutcome::Failed
            }
        }
    }

    fn token(&self, sender: &dyn CommandSender, args: &[&str]) -> AdminOutcome {
        let regenerate = args
            .first()
            .is_some_and(|arg| arg.eq_ignore_ascii_case("regenerate"));
        if !regenerate {
            sender.send_message(&format!("Current token: {}", self.gateway.token()));
            sender.send_message("Use 'worldgate token regenerate' to generate a new token");
            return AdminOutcome::Handled;
        }
        match self.gateway.regenerate_token() {
            Ok(token) => {
                sender.send_message("Token regenerated successfully!");
                sender.send_message(&format!("New token: {token}"));
                AdminOutcome::Handled
            }
            Err(error) => {
                sender.send_message(&format!("Failed to regenerate token: {error}"));
                AdminOutcome::Failed
            }
        }
    }

    fn status(&self, sender: &dyn CommandSender) -> AdminOutcome {
        let status = self.gateway.status();
        sender.send_message("=== worldgate status ===");
        sender.send_message(&format!("Version: {}", env!("CARGO_PKG_VERSION")));
        sender.send_message(&format!(
            "Server Status: {}",
            if status.running { "Running" } else { "Stopped" }
        ));
        sender.send_message(&format!("Port: {}", status.port));
        sender.send_message(&format!(
            "Token Authentication: {}",
            if status.require_token {
                "Enabled"
            } else {
                "Disabled"
            }
        ));
        AdminOutcome::Handled
    }
}
