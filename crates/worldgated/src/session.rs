//! One-shot request/response protocol for a single connection.
//!
//! Every connection carries exactly one exchange:
//!
//! 1. read one newline-terminated line (bounded, with a read deadline);
//! 2. parse it as a request envelope;
//! 3. check the token;
//! 4. submit the command to the simulation executor and wait;
//! 5. write one response line and close.
//!
//! Protocol, authentication, validation, and command failures all produce a
//! `{"success":false,...}` line. Socket failures are logged and the
//! connection is dropped without a reply, since the channel itself is gone.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use worldgate_config::LoggingConfig;
use worldgate_protocol::{MAX_REQUEST_BYTES, ProtocolError, RequestEnvelope, Response};

use crate::auth::TokenAuthenticator;
use crate::executor::{ExecutorError, SimulationExecutor};
use crate::registry::{CommandRegistry, CommandResult};
use crate::transport::{ConnectionHandler, ConnectionStream, LineError, read_request_line};
use crate::world::World;

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

const INVALID_TOKEN: &str = "Invalid token";
const SHUTTING_DOWN: &str = "Server is shutting down";
const TIMED_OUT: &str = "Command timed out";
const DISCARD_BUDGET: usize = 4 * MAX_REQUEST_BYTES;
const DISCARD_TIMEOUT: Duration = Duration::from_millis(250);

/// Transport failures; logged, never reported to the peer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the socket failed.
    #[error("session I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The response could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Runtime-adjustable logging switches shared by every session.
#[derive(Debug)]
pub struct LogSwitches {
    commands: AtomicBool,
    connections: AtomicBool,
}

impl LogSwitches {
    /// Builds switches from the logging configuration.
    #[must_use]
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            commands: AtomicBool::new(config.log_commands),
            connections: AtomicBool::new(config.log_connections),
        }
    }

    /// Applies reloaded configuration.
    pub fn apply(&self, config: &LoggingConfig) {
        self.commands.store(config.log_commands, Ordering::SeqCst);
        self.connections
            .store(config.log_connections, Ordering::SeqCst);
    }

    /// Whether each executed command is logged.
    #[must_use]
    pub fn commands(&self) -> bool {
        self.commands.load(Ordering::SeqCst)
    }

    /// Whether each accepted connection is logged.
    #[must_use]
    pub fn connections(&self) -> bool {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Serves sessions against a shared executor.
pub(crate) struct SessionHandler<W> {
    auth: Arc<TokenAuthenticator>,
    registry: Arc<CommandRegistry>,
    executor: Arc<SimulationExecutor<W>>,
    switches: Arc<LogSwitches>,
    read_timeout: Option<Duration>,
}

impl<W: World> SessionHandler<W> {
    pub(crate) const fn new(
        auth: Arc<TokenAuthenticator>,
        registry: Arc<CommandRegistry>,
        executor: Arc<SimulationExecutor<W>>,
        switches: Arc<LogSwitches>,
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            auth,
            registry,
            executor,
            switches,
            read_timeout,
        }
    }

    /// Turns one request line into its response.
    pub(crate) fn respond(&self, line: &[u8]) -> Response {
        match self.evaluate(line) {
            Ok(result) => result.into_response(),
            Err(message) => Response::failure(message),
        }
    }

    fn evaluate(&self, line: &[u8]) -> Result<CommandResult, String> {
        let request = RequestEnvelope::parse(line).map_err(|error| error.to_string())?;
        if !self.auth.validate(request.token()) {
            return Err(INVALID_TOKEN.to_owned());
        }
        let (action, params) = request.into_parts().map_err(|error| error.to_string())?;
        let registry = Arc::clone(&self.registry);
        let command = action.clone();
        let result = self
            .executor
            .submit(move |world: &mut W| registry.dispatch(world, &command, &params))
            .map_err(describe_executor_error)?;
        if self.switches.commands() {
            info!(
                target: SESSION_TARGET,
                action = %action,
                success = result.is_success(),
                "command executed"
            );
        }
        Ok(result)
    }

    fn serve(&self, stream: &mut ConnectionStream) -> Result<(), SessionError> {
        stream.set_read_timeout(self.read_timeout)?;
        let (response, oversized) = match read_request_line(stream, MAX_REQUEST_BYTES) {
            Ok(Some(line)) => (self.respond(&line), false),
            Ok(None) => (Response::failure(ProtocolError::Empty.to_string()), false),
            Err(LineError::TooLarge { size, limit }) => (
                Response::failure(ProtocolError::too_large(size, limit).to_string()),
                true,
            ),
            Err(LineError::Io(error)) => return Err(SessionError::Io(error)),
        };
        stream.write_all(response.to_line()?.as_bytes())?;
        stream.flush()?;
        if oversized {
            stream.discard_input(DISCARD_BUDGET, DISCARD_TIMEOUT)?;
        }
        Ok(())
    }
}

impl<W: World> ConnectionHandler for SessionHandler<W> {
    fn handle(&self, mut stream: ConnectionStream) {
        let peer = stream.peer();
        if self.switches.connections() {
            info!(target: SESSION_TARGET, peer = ?peer, "connection accepted");
        }
        if let Err(error) = self.serve(&mut stream) {
            debug!(
                target: SESSION_TARGET,
                peer = ?peer,
                error = %error,
                "session ended without a response"
            );
        }
        if let Err(error) = stream.close() {
            debug!(target: SESSION_TARGET, error = %error, "failed to close session socket");
        }
    }
}

fn describe_executor_error(error: ExecutorError) -> String {
    match error {
        ExecutorError::Unavailable => SHUTTING_DOWN.to_owned(),
        ExecutorError::TimedOut { .. } => TIMED_OUT.to_owned(),
        ExecutorError::Fault { message } => format!("Error executing command: {message}"),
        other => format!("Error executing command: {other}"),
    }
}
