//! Shared fixtures for the daemon test suites.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use worldgate_config::{Config, ConfigError};
use worldgate_protocol::{Params, RequestEnvelope, Response};

use crate::admin::CommandSender;
use crate::auth::{AuthError, TokenStore};
use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::gateway::{Gateway, GatewayContext};
use crate::health::HealthReporter;
use crate::world::{Location, MemoryWorld};

/// Token every fixture gateway starts with.
pub const TEST_TOKEN: &str = "test-token-0123456789";

const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Loopback configuration on an ephemeral port with a short read deadline.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.host = String::from("127.0.0.1");
    config.port = 0;
    config.max_connections = 4;
    config.read_timeout_ms = 2_000;
    config.tick_interval_ms = 0;
    config.shutdown_grace_ms = 2_000;
    config
}

/// World with `Steve` and `Alex` online at the origin.
pub fn test_world() -> MemoryWorld {
    MemoryWorld::with_players(Location::at(0.5, 64.0, 0.5), ["Steve", "Alex"])
}

/// Loader whose configuration tests can edit between reloads.
#[derive(Default)]
pub struct SharedConfigLoader {
    config: Mutex<Config>,
    fail: Mutex<bool>,
}

impl SharedConfigLoader {
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
            fail: Mutex::new(false),
        }
    }

    pub fn edit(&self, edit: impl FnOnce(&mut Config)) {
        edit(&mut self.config.lock().expect("config mutex poisoned"));
    }

    pub fn fail_next_loads(&self, fail: bool) {
        *self.fail.lock().expect("fail flag mutex poisoned") = fail;
    }
}

impl ConfigLoader for SharedConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        if *self.fail.lock().expect("fail flag mutex poisoned") {
            let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
            return Err(ConfigError::Read {
                path: "memory.toml".into(),
                source,
            });
        }
        Ok(self.config.lock().expect("config mutex poisoned").clone())
    }
}

/// In-memory token store that can be edited out of band or made to fail.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
    fail_persist: Mutex<bool>,
    persisted: Mutex<Vec<String>>,
}

impl MemoryTokenStore {
    pub fn holding(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_owned())),
            ..Self::default()
        }
    }

    pub fn overwrite(&self, token: &str) {
        *self.token.lock().expect("token mutex poisoned") = Some(token.to_owned());
    }

    pub fn stored(&self) -> Option<String> {
        self.token.lock().expect("token mutex poisoned").clone()
    }

    pub fn persisted(&self) -> Vec<String> {
        self.persisted.lock().expect("persisted mutex poisoned").clone()
    }

    pub fn fail_persist(&self, fail: bool) {
        *self.fail_persist.lock().expect("fail flag mutex poisoned") = fail;
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, AuthError> {
        Ok(self.stored())
    }

    fn persist(&self, token: &str) -> Result<(), AuthError> {
        if *self.fail_persist.lock().expect("fail flag mutex poisoned") {
            let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
            return Err(AuthError::from(ConfigError::Write {
                path: "memory.toml".into(),
                source,
            }));
        }
        self.overwrite(token);
        self.persisted
            .lock()
            .expect("persisted mutex poisoned")
            .push(token.to_owned());
        Ok(())
    }
}

/// Gateway plus handles on every collaborator it was built from.
pub struct Harness {
    pub gateway: Arc<Gateway>,
    pub loader: Arc<SharedConfigLoader>,
    pub store: Arc<MemoryTokenStore>,
    pub reporter: Arc<RecordingHealthReporter>,
}

impl Harness {
    /// Builds a stopped gateway around `config`.
    pub fn new(config: Config) -> Self {
        let loader = Arc::new(SharedConfigLoader::new(config.clone()));
        let store = Arc::new(MemoryTokenStore::holding(TEST_TOKEN));
        let reporter = Arc::new(RecordingHealthReporter::default());
        let gateway = Gateway::new(GatewayContext {
            config,
            loader: Arc::clone(&loader) as Arc<dyn ConfigLoader>,
            token_store: Arc::clone(&store) as Arc<dyn TokenStore>,
            world: test_world(),
            reporter: Arc::clone(&reporter) as Arc<dyn HealthReporter>,
        })
        .expect("gateway should build");
        Self {
            gateway: Arc::new(gateway),
            loader,
            store,
            reporter,
        }
    }

    /// Builds and starts a gateway, returning the harness and bound address.
    pub fn running() -> (Self, SocketAddr) {
        let harness = Self::new(test_config());
        let address = harness.gateway.start().expect("gateway should start");
        (harness, address)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.gateway.stop();
    }
}

/// Writes `line` as-is and returns everything the server sends back.
pub fn exchange_raw(address: SocketAddr, line: &[u8]) -> String {
    let mut stream = TcpStream::connect(address).expect("connect to gateway");
    stream
        .set_read_timeout(Some(IO_TIMEOUT))
        .expect("set read timeout");
    stream.write_all(line).expect("write request");
    stream.flush().expect("flush request");
    let mut reply = String::new();
    stream.read_to_string(&mut reply).expect("read reply");
    reply
}

/// Writes `line` and half-closes the socket before reading the reply.
pub fn exchange_then_close(address: SocketAddr, line: &[u8]) -> String {
    let mut stream = TcpStream::connect(address).expect("connect to gateway");
    stream
        .set_read_timeout(Some(IO_TIMEOUT))
        .expect("set read timeout");
    stream.write_all(line).expect("write request");
    stream.shutdown(Shutdown::Write).expect("half-close");
    let mut reply = String::new();
    stream.read_to_string(&mut reply).expect("read reply");
    reply
}

/// Sends one request and decodes the response.
pub fn request(address: SocketAddr, token: &str, action: &str, params: Value) -> Response {
    let params: Params = match params {
        Value::Object(map) => map,
        Value::Null => Params::new(),
        other => panic!("params must be an object, got {other}"),
    };
    let line = RequestEnvelope::new(token, action, params)
        .to_line()
        .expect("encode request");
    let reply = exchange_raw(address, line.as_bytes());
    Response::parse(reply.as_bytes()).expect("decode response")
}

/// Lifecycle events captured by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    GatewayListening(u16),
    GatewayStopped(usize),
    TokenRegenerated,
}

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn gateway_listening(&self, address: SocketAddr) {
        self.record(HealthEvent::GatewayListening(address.port()));
    }

    fn gateway_stopped(&self, abandoned_sessions: usize) {
        self.record(HealthEvent::GatewayStopped(abandoned_sessions));
    }

    fn token_regenerated(&self) {
        self.record(HealthEvent::TokenRegenerated);
    }
}

/// Command sender that records replies and holds a configurable permission.
pub struct RecordingSender {
    admin: bool,
    messages: Mutex<Vec<String>>,
}

impl RecordingSender {
    pub fn admin() -> Self {
        Self {
            admin: true,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn guest() -> Self {
        Self {
            admin: false,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages mutex poisoned").clone()
    }

    pub fn transcript(&self) -> String {
        self.messages().join("\n")
    }
}

impl CommandSender for RecordingSender {
    fn name(&self) -> &str {
        if self.admin { "operator" } else { "guest" }
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.admin && permission == crate::admin::ADMIN_PERMISSION
    }

    fn send_message(&self, message: &str) {
        self.messages
            .lock()
            .expect("messages mutex poisoned")
            .push(message.to_owned());
    }
}
