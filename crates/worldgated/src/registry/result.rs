//! Outcome of a dispatched command.

use serde_json::Value;
use worldgate_protocol::Response;

use super::CommandError;

/// Either the data produced by a command or the message explaining why it
/// failed. Never both.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// The command completed and produced `data`.
    Success(Value),
    /// The command was rejected or failed.
    Failure(String),
}

impl CommandResult {
    /// Builds a failure from any displayable error.
    pub fn failure(error: impl ToString) -> Self {
        Self::Failure(error.to_string())
    }

    /// Returns whether the command succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Converts the outcome into its wire response.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Success(data) => Response::success(data),
            Self::Failure(message) => Response::failure(message),
        }
    }
}

impl From<Result<Value, CommandError>> for CommandResult {
    fn from(result: Result<Value, CommandError>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(error) => Self::failure(error),
        }
    }
}
