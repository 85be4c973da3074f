//! Request envelope decoding.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ProtocolError;

/// Maximum size of a single request line in bytes, not counting the
/// trailing `\n` or `\r\n`.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Returns `line` without one trailing `\n` or `\r\n` delimiter.
#[must_use]
pub fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Command parameters: an arbitrary JSON object.
pub type Params = Map<String, Value>;

/// One decoded request line.
///
/// `token` and `action` are always present after decoding: an absent or
/// `null` member decodes to the empty string, and a non-string scalar is
/// rendered with its JSON text. `params` is kept undecoded until
/// [`RequestEnvelope::into_parts`] so that authentication can run before a
/// malformed parameter object is reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEnvelope {
    token: String,
    action: String,
    params: Value,
}

impl RequestEnvelope {
    /// Builds a request for sending.
    #[must_use]
    pub fn new(token: impl Into<String>, action: impl Into<String>, params: Params) -> Self {
        Self {
            token: token.into(),
            action: action.into(),
            params: Value::Object(params),
        }
    }

    /// Decodes a single request line.
    ///
    /// Surrounding whitespace, including the newline delimiter, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Empty`] for a blank line,
    /// [`ProtocolError::TooLarge`] when the line without its delimiter
    /// exceeds [`MAX_REQUEST_BYTES`], and [`ProtocolError::InvalidJson`] when
    /// the line is not a JSON object.
    pub fn parse(line: &[u8]) -> Result<Self, ProtocolError> {
        let body = strip_line_ending(line);
        if body.len() > MAX_REQUEST_BYTES {
            return Err(ProtocolError::too_large(body.len(), MAX_REQUEST_BYTES));
        }
        let trimmed = body.trim_ascii();
        if trimmed.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let decoded: Value =
            serde_json::from_slice(trimmed).map_err(|_| ProtocolError::InvalidJson)?;
        let Value::Object(mut object) = decoded else {
            return Err(ProtocolError::InvalidJson);
        };

        Ok(Self {
            token: take_text(&mut object, "token"),
            action: take_text(&mut object, "action"),
            params: object.remove("params").unwrap_or(Value::Null),
        })
    }

    /// The presented credential.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The requested command name, as sent.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Splits the envelope into the action name and its parameter mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidParams`] when `params` is present but
    /// is not a JSON object.
    pub fn into_parts(self) -> Result<(String, Params), ProtocolError> {
        match self.params {
            Value::Null => Ok((self.action, Params::new())),
            Value::Object(params) => Ok((self.action, params)),
            _ => Err(ProtocolError::InvalidParams),
        }
    }

    /// Serialises the envelope as a newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns the serialiser error when encoding fails.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

fn take_text(object: &mut Map<String, Value>, key: &str) -> String {
    match object.remove(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    }
}
