//! Command table and dispatch.
//!
//! The registry maps case-insensitive action names to a [`CommandSpec`]: the
//! parameters the command requires and the function that runs it against the
//! world. The table is built once at startup and never mutated afterwards, so
//! sessions share it without locking.
//!
//! [`CommandRegistry::dispatch`] is the fault boundary for command code. A
//! failing command yields [`CommandResult::Failure`] and a panicking one is
//! caught and reported the same way; nothing escapes to the caller.

mod commands;
mod errors;
mod params;
mod result;

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::debug;
use worldgate_protocol::Params;

use crate::executor::panic_message;
use crate::world::World;

pub use self::errors::CommandError;
pub use self::params::{Arguments, ParamKind, ParamSpec};
pub use self::result::CommandResult;

/// Tracing target for registry operations.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Function that executes a command against the world.
pub type CommandFn = fn(&mut dyn World, Arguments<'_>) -> Result<Value, CommandError>;

/// Immutable description of one command.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    /// Canonical lowercase action name.
    pub name: &'static str,
    /// Parameters that must be present with the declared type.
    pub required: &'static [ParamSpec],
    /// Implementation.
    pub execute: CommandFn,
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// Read-only table of commands keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandSpec>,
}

impl CommandRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the registry holding every built-in command.
    #[must_use]
    pub fn builtin() -> Self {
        commands::BUILTIN
            .iter()
            .copied()
            .fold(Self::empty(), Self::with)
    }

    /// Adds `spec`, replacing any command with the same name.
    #[must_use]
    pub fn with(mut self, spec: CommandSpec) -> Self {
        self.commands.insert(spec.name.to_ascii_lowercase(), spec);
        self
    }

    /// Finds a command by name, ignoring case.
    #[must_use]
    pub fn lookup(&self, action: &str) -> Option<&CommandSpec> {
        self.commands.get(&action.to_ascii_lowercase())
    }

    /// Sorted names of all registered commands.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.values().map(|spec| spec.name).collect();
        names.sort_unstable();
        names
    }

    /// Validates and runs `action` against `world`.
    ///
    /// Must be called on the thread that owns the world.
    pub fn dispatch(&self, world: &mut dyn World, action: &str, params: &Params) -> CommandResult {
        self.try_dispatch(world, action, params).into()
    }

    fn try_dispatch(
        &self,
        world: &mut dyn World,
        action: &str,
        params: &Params,
    ) -> Result<Value, CommandError> {
        let spec = self
            .lookup(action)
            .ok_or_else(|| CommandError::unknown_action(action))?;
        params::validate(spec.required, params)?;
        let arguments = Arguments::new(params);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (spec.execute)(world, arguments)))
            .map_err(|payload| CommandError::fault(panic_message(payload.as_ref())))?;
        if let Err(error) = &outcome {
            debug!(
                target: REGISTRY_TARGET,
                command = spec.name,
                error = %error,
                "command rejected"
            );
        }
        outcome
    }
}
