//! Client error type.

use std::io;

use serde_json::Value;
use thiserror::Error;
use worldgate_protocol::ProtocolError;

/// Failure of one request to the gateway.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No connection could be established.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// `host:port` that was dialled.
        address: String,
        /// Socket error.
        #[source]
        source: io::Error,
    },
    /// The connection failed mid-exchange.
    #[error("connection to the gateway failed: {0}")]
    Io(#[from] io::Error),
    /// The exchange did not follow the line protocol.
    #[error("malformed exchange with the gateway: {0}")]
    Protocol(#[from] ProtocolError),
    /// The gateway closed the connection without answering.
    #[error("connection closed by server")]
    Closed,
    /// The request could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    /// The gateway rejected the token.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Failure text from the gateway.
        message: String,
    },
    /// The command ran and failed, or was rejected.
    #[error("{message}")]
    Command {
        /// Failure text from the gateway.
        message: String,
    },
    /// A typed helper received data of an unexpected shape.
    #[error("unexpected data from '{action}': {data}")]
    UnexpectedData {
        /// Command that answered.
        action: &'static str,
        /// Data received.
        data: Value,
    },
}

impl ClientError {
    pub(crate) fn from_failure(message: String) -> Self {
        if message == "Invalid token" {
            Self::Authentication { message }
        } else {
            Self::Command { message }
        }
    }
}
