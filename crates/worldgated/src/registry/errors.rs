//! Failures raised while validating or executing a command.

use thiserror::Error;

/// Errors a command reports back to the client.
///
/// The rendered message is exactly what the client sees in the `error`
/// field of the response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No command is registered under the requested name.
    #[error("Unknown action: {action}")]
    UnknownAction {
        /// Action as supplied by the client.
        action: String,
    },

    /// One or more required parameters were absent.
    #[error("{}", describe_missing(.names))]
    MissingParameters {
        /// Names of the absent parameters, in declaration order.
        names: Vec<&'static str>,
    },

    /// A parameter was present with the wrong JSON type.
    #[error("Invalid parameter '{name}': expected {expected}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Human description of the accepted type.
        expected: &'static str,
    },

    /// The request was well-formed but the world rejected it.
    #[error("{message}")]
    Domain {
        /// Message shown to the client.
        message: String,
    },

    /// The command panicked while running.
    #[error("Error executing command: {message}")]
    Fault {
        /// Panic payload, when it carried text.
        message: String,
    },
}

impl CommandError {
    /// Builds a [`CommandError::UnknownAction`].
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Builds a [`CommandError::InvalidParameter`].
    pub fn invalid_parameter(name: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            expected,
        }
    }

    /// Builds a [`CommandError::Domain`].
    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain {
            message: message.into(),
        }
    }

    /// Builds a [`CommandError::Fault`].
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }

    /// Builds the "Player not found" domain error.
    pub(crate) fn player_not_found(name: &str) -> Self {
        Self::domain(format!("Player not found: {name}"))
    }

    /// Returns whether the error stems from request validation rather than
    /// world state.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownAction { .. }
                | Self::MissingParameters { .. }
                | Self::InvalidParameter { .. }
        )
    }
}

fn describe_missing(names: &[&'static str]) -> String {
    match names {
        [single] => format!("Missing parameter: {single}"),
        _ => format!("Missing parameters: {}", names.join(", ")),
    }
}
