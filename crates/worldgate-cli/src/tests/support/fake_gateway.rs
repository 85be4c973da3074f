//! Fake gateway for client tests.
//!
//! Accepts one connection, records the request line, and answers with a
//! canned reply before closing.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

/// A mock gateway that serves a single exchange on an ephemeral port.
pub(in crate::tests) struct FakeGateway {
    port: u16,
    request: Arc<Mutex<Option<String>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeGateway {
    /// Replies with `reply` verbatim; `None` closes without replying.
    pub fn spawn(reply: Option<String>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake gateway")?;
        listener
            .set_nonblocking(true)
            .context("fake gateway nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let request = Arc::new(Mutex::new(None));
        let recorded = Arc::clone(&request);
        let handle = thread::spawn(move || Self::serve(&listener, reply.as_deref(), &recorded));
        Ok(Self {
            port,
            request,
            handle: Some(handle),
        })
    }

    /// Replies with the JSON encoding of `reply`.
    pub fn replying(reply: &Value) -> Result<Self> {
        Self::spawn(Some(format!("{reply}\n")))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the exchange to finish and returns the decoded request.
    pub fn take_request(&mut self) -> Result<Value> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake gateway thread panicked"))?
                .context("fake gateway failed")?;
        }
        let line = self
            .request
            .lock()
            .map_err(|error| anyhow!("lock request: {error}"))?
            .take()
            .context("no request received")?;
        serde_json::from_str(&line).context("decode request")
    }

    fn serve(
        listener: &TcpListener,
        reply: Option<&str>,
        request: &Mutex<Option<String>>,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let stream = loop {
            match listener.accept() {
                Ok((stream, _)) => break stream,
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error).context("accept connection"),
            }
        };
        stream.set_nonblocking(false).context("blocking stream")?;
        let line = read_line(&stream)?;
        *request
            .lock()
            .map_err(|error| anyhow!("lock request: {error}"))? = Some(line);
        if let Some(reply) = reply {
            let mut stream = stream;
            stream.write_all(reply.as_bytes()).context("write reply")?;
            stream.flush().context("flush reply")?;
        }
        Ok(())
    }
}

fn read_line(stream: &TcpStream) -> Result<String> {
    let mut line = String::new();
    BufReader::new(stream.try_clone().context("clone stream")?)
        .read_line(&mut line)
        .context("read request")?;
    Ok(line)
}

impl Drop for FakeGateway {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
