//! Lifecycle facade composing authenticator, registry, executor, and listener.
//!
//! A [`Gateway`] is built from explicit collaborators and owns everything it
//! starts; there is no process-wide state. The world lives inside the
//! gateway while stopped and moves onto the simulation thread while running,
//! so a clean stop followed by a new start resumes the same world.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use thiserror::Error;
use tracing::{info, warn};

use worldgate_config::{Config, ConfigError};

use crate::auth::{AuthError, TokenAuthenticator, TokenStore};
use crate::bootstrap::ConfigLoader;
use crate::executor::{ExecutorError, ExecutorSettings, SimulationExecutor};
use crate::health::HealthReporter;
use crate::registry::CommandRegistry;
use crate::session::{LogSwitches, SessionHandler};
use crate::transport::{ConnectionHandler, ListenerError, ListenerHandle, SocketListener};
use crate::world::{MemoryWorld, World};

const GATEWAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::gateway");

/// Errors raised by gateway lifecycle operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// `start` was called while the gateway was running.
    #[error("gateway is already running")]
    AlreadyRunning,
    /// The world was not handed back by an earlier stop.
    #[error("world is unavailable; the previous simulation thread did not stop in time")]
    WorldUnavailable,
    /// The listener could not bind or start.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// The simulation executor failed to start or stop.
    #[error("simulation executor failed: {0}")]
    Executor(#[from] ExecutorError),
    /// Token storage failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Configuration could not be reloaded.
    #[error("failed to reload configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Collaborators a gateway is built from.
pub struct GatewayContext<W = MemoryWorld> {
    /// Initial configuration.
    pub config: Config,
    /// Source consulted by [`Gateway::reload`].
    pub loader: Arc<dyn ConfigLoader>,
    /// Persistent home of the token.
    pub token_store: Arc<dyn TokenStore>,
    /// World handed to the simulation thread on start.
    pub world: W,
    /// Lifecycle observer.
    pub reporter: Arc<dyn HealthReporter>,
}

/// Snapshot returned by [`Gateway::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayStatus {
    /// Whether the listener is accepting connections.
    pub running: bool,
    /// Bound port while running, configured port otherwise.
    pub port: u16,
    /// Whether requests must carry the token.
    pub require_token: bool,
}

/// What a [`Gateway::reload`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadOutcome {
    /// The token was edited in storage and has been adopted.
    pub token_changed: bool,
    /// Listener settings changed and wait for the next start.
    pub restart_required: bool,
}

struct Running<W> {
    listener: ListenerHandle,
    executor: Arc<SimulationExecutor<W>>,
}

struct Slot<W> {
    world: Option<W>,
    running: Option<Running<W>>,
}

/// Remote command gateway.
pub struct Gateway<W = MemoryWorld> {
    loader: Arc<dyn ConfigLoader>,
    config: RwLock<Config>,
    auth: Arc<TokenAuthenticator>,
    registry: Arc<CommandRegistry>,
    switches: Arc<LogSwitches>,
    reporter: Arc<dyn HealthReporter>,
    slot: Mutex<Slot<W>>,
}

impl<W: World> Gateway<W> {
    /// Builds a stopped gateway with the built-in command table.
    ///
    /// The token is loaded from the store, or generated and persisted when
    /// the store holds none.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Auth`] when the token cannot be loaded or
    /// persisted.
    pub fn new(context: GatewayContext<W>) -> Result<Self, GatewayError> {
        Self::with_registry(context, CommandRegistry::builtin())
    }

    /// Builds a stopped gateway serving `registry`.
    ///
    /// # Errors
    ///
    /// See [`Gateway::new`].
    pub fn with_registry(
        context: GatewayContext<W>,
        registry: CommandRegistry,
    ) -> Result<Self, GatewayError> {
        let GatewayContext {
            config,
            loader,
            token_store,
            world,
            reporter,
        } = context;
        let auth = TokenAuthenticator::issue_or_load(token_store, config.require_token)?;
        Ok(Self {
            loader,
            switches: Arc::new(LogSwitches::new(&config.logging())),
            config: RwLock::new(config),
            auth: Arc::new(auth),
            registry: Arc::new(registry),
            reporter,
            slot: Mutex::new(Slot {
                world: Some(world),
                running: None,
            }),
        })
    }

    /// Binds the listener, starts the simulation thread, and begins serving.
    ///
    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::AlreadyRunning`] when already started.
    /// - [`GatewayError::Listener`] when the address cannot be bound; the
    ///   gateway stays stopped.
    /// - [`GatewayError::Executor`] when the simulation thread cannot start.
    pub fn start(&self) -> Result<SocketAddr, GatewayError> {
        let mut slot = self.lock_slot();
        if slot.running.is_some() {
            return Err(GatewayError::AlreadyRunning);
        }
        let config = self.config();

        let listener = SocketListener::bind(&config.host, config.port)?;
        let Some(world) = slot.world.take() else {
            return Err(GatewayError::WorldUnavailable);
        };
        let executor = Arc::new(SimulationExecutor::spawn(
            world,
            ExecutorSettings::from(&config.executor()),
        )?);

        let handler: Arc<dyn ConnectionHandler> = Arc::new(SessionHandler::new(
            Arc::clone(&self.auth),
            Arc::clone(&self.registry),
            Arc::clone(&executor),
            Arc::clone(&self.switches),
            config.server().read_timeout(),
        ));
        let listener = match listener.start(config.max_connections, handler) {
            Ok(listener) => listener,
            Err(error) => {
                slot.world = executor.shutdown(config.executor().shutdown_grace()).ok();
                return Err(error.into());
            }
        };

        let address = listener.local_addr();
        slot.running = Some(Running { listener, executor });
        self.reporter.gateway_listening(address);
        Ok(address)
    }

    /// Stops serving. Calling `stop` on a stopped gateway does nothing.
    ///
    /// The listener closes first and in-flight sessions get the grace period
    /// to finish, then the simulation thread drains its queue and hands the
    /// world back.
    ///
    /// # Errors
    ///
    /// Returns the first listener or executor error met while stopping. The
    /// gateway is stopped either way.
    pub fn stop(&self) -> Result<(), GatewayError> {
        let Some(Running { listener, executor }) = self.lock_slot().running.take() else {
            return Ok(());
        };
        let grace = self.config().executor().shutdown_grace();

        // The slot lock must not be held here: `status` has to answer while
        // sessions drain.
        let abandoned = listener.join(grace);
        let world = executor.shutdown(grace);
        let mut slot = self.lock_slot();
        let abandoned = match abandoned {
            Ok(count) => count,
            Err(error) => {
                slot.world = world.ok();
                return Err(error.into());
            }
        };
        slot.world = Some(world?);
        drop(slot);
        self.reporter.gateway_stopped(abandoned);
        Ok(())
    }

    /// Reports whether the gateway is serving, on which port, and whether
    /// the token is required.
    #[must_use]
    pub fn status(&self) -> GatewayStatus {
        let bound = self
            .lock_slot()
            .running
            .as_ref()
            .map(|running| running.listener.local_addr().port());
        GatewayStatus {
            running: bound.is_some(),
            port: bound.unwrap_or_else(|| self.config().port),
            require_token: self.auth.requires_token(),
        }
    }

    /// Re-reads configuration and applies what can change at runtime.
    ///
    /// The token requirement, logging switches, and an externally edited
    /// token apply immediately. Listener and executor settings apply on the
    /// next start.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] or [`GatewayError::Auth`] when the
    /// new configuration or token cannot be read; nothing is applied then.
    pub fn reload(&self) -> Result<ReloadOutcome, GatewayError> {
        let fresh = self.loader.load()?;
        let token_changed = self.auth.reload()?;
        self.auth.set_require_token(fresh.require_token);
        self.switches.apply(&fresh.logging());

        let running = self.is_running();
        let mut current = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let restart_required =
            fresh.server() != current.server() || fresh.executor() != current.executor();
        if restart_required && running {
            warn!(
                target: GATEWAY_TARGET,
                "listener and executor settings take effect after a restart"
            );
        }
        *current = fresh;
        info!(
            target: GATEWAY_TARGET,
            require_token = current.require_token,
            token_changed,
            "configuration reloaded"
        );
        Ok(ReloadOutcome {
            token_changed,
            restart_required,
        })
    }

    /// Current token.
    #[must_use]
    pub fn token(&self) -> Arc<str> {
        self.auth.token()
    }

    /// Generates, persists, and publishes a new token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Auth`] when the token cannot be persisted;
    /// the previous token stays valid.
    pub fn regenerate_token(&self) -> Result<Arc<str>, GatewayError> {
        let token = self.auth.regenerate()?;
        self.reporter.token_regenerated();
        Ok(token)
    }

    /// Whether the listener is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock_slot().running.is_some()
    }

    /// Configuration currently in force.
    #[must_use]
    pub fn config(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs `inspect` against the world while the gateway is stopped.
    ///
    /// Returns `None` while running; use the protocol then.
    pub fn with_world<T>(&self, inspect: impl FnOnce(&W) -> T) -> Option<T> {
        self.lock_slot().world.as_ref().map(inspect)
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot<W>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W> Drop for Gateway<W> {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = slot.running.take() {
            running.listener.shutdown();
        }
    }
}
