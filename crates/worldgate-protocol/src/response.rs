//! Response line encoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

/// The single response line written before the server closes a session.
///
/// Success responses carry `data` and omit `error`; failure responses carry
/// the human-readable `error` and an explicit `"data":null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the command completed.
    pub success: bool,
    /// Failure message, present only when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Command payload, `null` on failure.
    #[serde(default)]
    pub data: Value,
}

impl Response {
    /// Builds a success response carrying `data`.
    #[must_use]
    pub const fn success(data: Value) -> Self {
        Self {
            success: true,
            error: None,
            data,
        }
    }

    /// Builds a failure response carrying `message`.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            data: Value::Null,
        }
    }

    /// Serialises the response as a newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns the serialiser error when encoding fails.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decodes a response line received from the server.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Empty`] for a blank line and
    /// [`ProtocolError::InvalidJson`] when the line does not match the
    /// response schema.
    pub fn parse(line: &[u8]) -> Result<Self, ProtocolError> {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            return Err(ProtocolError::Empty);
        }
        serde_json::from_slice(trimmed).map_err(|_| ProtocolError::InvalidJson)
    }
}
