//! Fixed-size pool of session worker threads.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender};
use tracing::{debug, warn};

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};
use crate::executor::panic_message;

const HAND_OFF_POLL: Duration = Duration::from_millis(50);
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Worker threads fed through a rendezvous channel.
pub(crate) struct WorkerPool {
    intake: Sender<ConnectionStream>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn spawn(
        size: usize,
        handler: &Arc<dyn ConnectionHandler>,
    ) -> Result<Self, ListenerError> {
        let (intake, queue) = crossbeam_channel::bounded(0);
        let workers = (0..size.max(1))
            .map(|index| {
                let queue = queue.clone();
                let handler = Arc::clone(handler);
                thread::Builder::new()
                    .name(format!("worldgate-session-{index}"))
                    .spawn(move || run_worker(&queue, handler.as_ref()))
                    .map_err(|source| ListenerError::Spawn {
                        role: "session worker",
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { intake, workers })
    }

    /// Blocks until an idle worker takes `stream`.
    ///
    /// Gives the stream back when `shutdown` is raised while waiting.
    pub(crate) fn hand_off(
        &self,
        mut stream: ConnectionStream,
        shutdown: &AtomicBool,
    ) -> Result<(), ConnectionStream> {
        loop {
            match self.intake.send_timeout(stream, HAND_OFF_POLL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => {
                    if shutdown.load(Ordering::SeqCst) {
                        return Err(returned);
                    }
                    stream = returned;
                }
                Err(SendTimeoutError::Disconnected(returned)) => return Err(returned),
            }
        }
    }

    /// Closes intake and waits up to `grace` for in-flight sessions.
    ///
    /// Returns the number of workers still busy when the grace period ended.
    pub(crate) fn drain(self, grace: Duration) -> usize {
        let Self { intake, workers } = self;
        drop(intake);
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline && !workers.iter().all(JoinHandle::is_finished) {
            thread::sleep(DRAIN_POLL);
        }
        let mut stragglers = 0;
        for worker in workers {
            if worker.is_finished() {
                if worker.join().is_err() {
                    warn!(target: LISTENER_TARGET, "session worker exited abnormally");
                }
            } else {
                stragglers += 1;
            }
        }
        if stragglers > 0 {
            warn!(
                target: LISTENER_TARGET,
                stragglers,
                grace_ms = grace.as_millis(),
                "session workers still busy after grace period"
            );
        }
        stragglers
    }
}

fn run_worker(queue: &Receiver<ConnectionStream>, handler: &dyn ConnectionHandler) {
    for stream in queue {
        let peer = stream.peer();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(stream))) {
            warn!(
                target: LISTENER_TARGET,
                peer = ?peer,
                panic = %panic_message(payload.as_ref()),
                "session handler panicked"
            );
        }
    }
    debug!(target: LISTENER_TARGET, "session worker exiting");
}
