//! Protocol-level failures that end a session before dispatch.

use thiserror::Error;

/// Errors raised while decoding a request or response line.
///
/// The display strings double as the client-facing failure messages, so they
/// are phrased for the remote caller rather than the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The line was absent or contained only whitespace.
    #[error("Empty request")]
    Empty,
    /// The line was not a JSON object.
    #[error("Invalid JSON")]
    InvalidJson,
    /// The `params` member was present but not an object.
    #[error("Invalid params")]
    InvalidParams,
    /// The line exceeded the request size limit.
    #[error("Request too large")]
    TooLarge {
        /// Observed size in bytes.
        size: usize,
        /// Maximum accepted size in bytes.
        limit: usize,
    },
}

impl ProtocolError {
    /// Creates a size-limit error for a line of `size` bytes.
    #[must_use]
    pub const fn too_large(size: usize, limit: usize) -> Self {
        Self::TooLarge { size, limit }
    }
}
