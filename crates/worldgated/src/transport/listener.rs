//! Listener implementation for the gateway TCP socket.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::pool::WorkerPool;
use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Bound, not yet accepting, TCP listener.
#[derive(Debug)]
pub(crate) struct SocketListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SocketListener {
    pub(crate) fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let listener = bind_tcp(host, port)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address actually bound; reports the real port when binding port 0.
    #[cfg(test)]
    pub(crate) const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns `workers` session threads and the accept loop.
    pub(crate) fn start(
        self,
        workers: usize,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let pool = WorkerPool::spawn(workers, &handler)?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let local_addr = self.local_addr;
        let handle = thread::Builder::new()
            .name(String::from("worldgate-accept"))
            .spawn(move || run_accept_loop(self, &shutdown_flag, pool))
            .map_err(|source| ListenerError::Spawn {
                role: "accept",
                source,
            })?;
        Ok(ListenerHandle {
            local_addr,
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept thread and its worker pool.
pub(crate) struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<WorkerPool>>,
}

impl ListenerHandle {
    pub(crate) const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Asks the accept loop to stop; the socket closes when it exits.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop, then drains in-flight sessions for up to
    /// `grace`. Returns the number of sessions abandoned.
    pub(crate) fn join(mut self, grace: Duration) -> Result<usize, ListenerError> {
        self.shutdown();
        let Some(handle) = self.handle.take() else {
            return Ok(0);
        };
        let pool = handle.join().map_err(|_| ListenerError::ThreadPanic)?;
        Ok(pool.drain(grace))
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(listener: SocketListener, shutdown: &AtomicBool, pool: WorkerPool) -> WorkerPool {
    info!(
        target: LISTENER_TARGET,
        address = %listener.local_addr,
        "gateway listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener) {
            Ok(Some(stream)) => {
                last_error = None;
                if let Err(stream) = pool.hand_off(stream, shutdown) {
                    debug!(
                        target: LISTENER_TARGET,
                        peer = ?stream.peer(),
                        "dropping connection accepted during shutdown"
                    );
                }
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(
        target: LISTENER_TARGET,
        address = %listener.local_addr,
        "gateway listener closed"
    );
    pool
}

fn accept_connection(listener: &TcpListener) -> Result<Option<ConnectionStream>, io::Error> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(ConnectionStream::new(stream)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_string(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}
