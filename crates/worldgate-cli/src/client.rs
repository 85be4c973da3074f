//! Blocking client for the gateway line protocol.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::{Map, Value, json};
use worldgate_protocol::{Params, RequestEnvelope, Response};

use crate::errors::ClientError;

/// Default gateway host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default gateway port.
pub const DEFAULT_PORT: u16 = 65535;
/// Default connect and read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_RESPONSE_BYTES: u64 = 16 * 1024 * 1024;

/// Connection settings; every call opens a fresh connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    host: String,
    port: u16,
    token: String,
    timeout: Duration,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, "")
    }
}

impl Client {
    /// Builds a client for `host:port` presenting `token`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replaces the connect and read timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port` this client dials.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sends one request and returns the `data` of a successful response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Authentication`] when the token is rejected,
    /// [`ClientError::Command`] for any other failure response, and
    /// transport or protocol errors when the exchange itself fails.
    pub fn send(&self, action: &str, params: Params) -> Result<Value, ClientError> {
        let response = self.exchange(&RequestEnvelope::new(self.token.as_str(), action, params))?;
        if response.success {
            Ok(response.data)
        } else {
            Err(ClientError::from_failure(
                response.error.unwrap_or_else(|| String::from("Unknown error")),
            ))
        }
    }

    fn exchange(&self, request: &RequestEnvelope) -> Result<Response, ClientError> {
        let mut stream = self.connect()?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.write_all(request.to_line()?.as_bytes())?;
        stream.flush()?;

        let mut reader = BufReader::new(stream.take(MAX_RESPONSE_BYTES));
        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Err(ClientError::Closed);
        }
        Ok(Response::parse(&line)?)
    }

    fn connect(&self) -> Result<TcpStream, ClientError> {
        let candidates: Vec<SocketAddr> = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(resolved) => resolved.collect(),
            Err(source) => return Err(self.connect_error(source)),
        };
        let mut last_error = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(error) => last_error = Some(error),
            }
        }
        Err(self.connect_error(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses")
        })))
    }

    fn connect_error(&self, source: io::Error) -> ClientError {
        ClientError::Connect {
            address: self.address(),
            source,
        }
    }

    /// Places `block` at a position. Returns the number of blocks changed.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn setblock(&self, x: i32, y: i32, z: i32, block: &str) -> Result<u64, ClientError> {
        self.setblock_with(x, y, z, block, None, None)
    }

    /// Places `block` with block-state properties and tile data.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn setblock_with(
        &self,
        x: i32,
        y: i32,
        z: i32,
        block: &str,
        block_state: Option<Map<String, Value>>,
        nbt: Option<Map<String, Value>>,
    ) -> Result<u64, ClientError> {
        let mut params = params(json!({"x": x, "y": y, "z": z, "block": block}));
        if let Some(state) = block_state {
            params.insert(String::from("block_state"), Value::Object(state));
        }
        if let Some(nbt) = nbt {
            params.insert(String::from("nbt"), Value::Object(nbt));
        }
        count("setblock", self.send("setblock", params)?)
    }

    /// Reads the block id at a position, for example `minecraft:stone`.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn getblock(&self, x: i32, y: i32, z: i32) -> Result<String, ClientError> {
        let data = self.send("getblock", params(json!({"x": x, "y": y, "z": z})))?;
        text("getblock", data)
    }

    /// Fills the box between two corners. Returns the number of cells.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn fill(&self, from: [i32; 3], to: [i32; 3], block: &str) -> Result<u64, ClientError> {
        let mut params = corners(from, to);
        params.insert(String::from("block"), json!(block));
        count("fill", self.send("fill", params)?)
    }

    /// Copies the box between two corners so its minimum corner lands on
    /// `destination`. Returns the number of cells copied.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn clone_region(
        &self,
        from: [i32; 3],
        to: [i32; 3],
        destination: [i32; 3],
    ) -> Result<u64, ClientError> {
        let mut params = corners(from, to);
        let [dest_x, dest_y, dest_z] = destination;
        params.insert(String::from("dest_x"), json!(dest_x));
        params.insert(String::from("dest_y"), json!(dest_y));
        params.insert(String::from("dest_z"), json!(dest_z));
        count("clone", self.send("clone", params)?)
    }

    /// Block position of a player.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn getpos(&self, username: &str) -> Result<[i64; 3], ClientError> {
        let data = self.send("getpos", params(json!({"username": username})))?;
        let position = data
            .as_array()
            .and_then(|axes| match axes.as_slice() {
                [x, y, z] => Some([x.as_i64()?, y.as_i64()?, z.as_i64()?]),
                _ => None,
            });
        position.ok_or(ClientError::UnexpectedData {
            action: "getpos",
            data,
        })
    }

    /// Moves a player; `facing` sets yaw and pitch together.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn teleport(
        &self,
        username: &str,
        position: [f64; 3],
        facing: Option<(f32, f32)>,
    ) -> Result<bool, ClientError> {
        let [x, y, z] = position;
        let mut params = params(json!({"username": username, "x": x, "y": y, "z": z}));
        if let Some((yaw, pitch)) = facing {
            params.insert(String::from("yaw"), json!(yaw));
            params.insert(String::from("pitch"), json!(pitch));
        }
        flag("teleport", self.send("teleport", params)?)
    }

    /// Switches a player's game mode.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn gamemode(&self, username: &str, mode: &str) -> Result<bool, ClientError> {
        let data = self.send("gamemode", params(json!({"username": username, "mode": mode})))?;
        flag("gamemode", data)
    }

    /// Gives a player `amount` (1 to 64) of an item.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn give(&self, username: &str, item: &str, amount: u8) -> Result<bool, ClientError> {
        let data = self.send(
            "give",
            params(json!({"username": username, "item": item, "amount": amount})),
        )?;
        flag("give", data)
    }

    /// Runs `time set|add|query`. Returns the resulting time of day.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn time(&self, action: &str, value: Option<i64>) -> Result<u64, ClientError> {
        let mut params = params(json!({"action": action}));
        if let Some(value) = value {
            params.insert(String::from("value"), json!(value));
        }
        count("time", self.send("time", params)?)
    }

    /// Sets the weather, optionally for `duration` seconds.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn weather(&self, condition: &str, duration: Option<u32>) -> Result<bool, ClientError> {
        let mut params = params(json!({"condition": condition}));
        if let Some(duration) = duration {
            params.insert(String::from("duration"), json!(duration));
        }
        flag("weather", self.send("weather", params)?)
    }

    /// Spawns an entity. Returns its id.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn summon(&self, entity_type: &str, position: [f64; 3]) -> Result<String, ClientError> {
        let [x, y, z] = position;
        let data = self.send(
            "summon",
            params(json!({"entity_type": entity_type, "x": x, "y": y, "z": z})),
        )?;
        text("summon", data)
    }

    /// Removes entities matching `selector`: `all`, `player:<name>`, or an
    /// entity type. Returns how many were affected.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub fn kill(&self, selector: &str) -> Result<u64, ClientError> {
        count("kill", self.send("kill", params(json!({"selector": selector})))?)
    }
}

fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

fn corners(from: [i32; 3], to: [i32; 3]) -> Params {
    let [x1, y1, z1] = from;
    let [x2, y2, z2] = to;
    params(json!({"x1": x1, "y1": y1, "z1": z1, "x2": x2, "y2": y2, "z2": z2}))
}

fn count(action: &'static str, data: Value) -> Result<u64, ClientError> {
    data.as_u64()
        .ok_or(ClientError::UnexpectedData { action, data })
}

fn text(action: &'static str, data: Value) -> Result<String, ClientError> {
    match data {
        Value::String(text) => Ok(text),
        data => Err(ClientError::UnexpectedData { action, data }),
    }
}

fn flag(action: &'static str, data: Value) -> Result<bool, ClientError> {
    data.as_bool()
        .ok_or(ClientError::UnexpectedData { action, data })
}
