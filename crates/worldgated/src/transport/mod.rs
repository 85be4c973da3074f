//! TCP listener and session worker pool.
//!
//! The listener accepts connections on a background thread and hands each one
//! to a fixed pool of worker threads. The hand-off is a rendezvous: when every
//! worker is busy, accepting pauses until one frees up, so the kernel backlog
//! absorbs bursts instead of an unbounded in-process queue.

mod errors;
mod handler;
mod listener;
mod pool;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream, LineError, read_request_line};
pub(crate) use self::listener::{ListenerHandle, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
