//! Single-writer bridge to the simulation thread.
//!
//! [`SimulationExecutor`] owns the world on one dedicated thread. Any thread
//! may [`submit`](SimulationExecutor::submit) a closure; closures run one at a
//! time in submission order and the caller blocks until its closure has run.
//! Each work item carries its own one-slot result channel, so a caller only
//! ever observes its own result.
//!
//! Between work items the thread advances the world with [`World::tick`] at
//! the configured cadence.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

use worldgate_config::ExecutorConfig;

use crate::world::World;

pub(crate) const EXECUTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::executor");

const THREAD_NAME: &str = "worldgate-simulation";

type Job<W> = Box<dyn FnOnce(&mut W) + Send>;

enum Message<W> {
    Run(Job<W>),
    Stop,
}

/// Errors surfaced to callers of the executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The executor is stopping or stopped and no longer accepts work.
    #[error("simulation executor is unavailable")]
    Unavailable,
    /// The submitted work panicked.
    #[error("work panicked on the simulation thread: {message}")]
    Fault {
        /// Panic payload text.
        message: String,
    },
    /// No result arrived within the configured bound.
    #[error("no result from the simulation thread within {limit:?}")]
    TimedOut {
        /// Bound that elapsed.
        limit: Duration,
    },
    /// `submit` was called from the simulation thread itself.
    #[error("work submitted from the simulation thread would deadlock")]
    Reentrant,
    /// The simulation thread could not be started.
    #[error("failed to spawn simulation thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Timing knobs for the simulation thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Interval between world ticks; `None` disables ticking.
    pub tick_interval: Option<Duration>,
    /// Upper bound on waiting for a result; `None` waits forever.
    pub command_timeout: Option<Duration>,
}

impl From<&ExecutorConfig> for ExecutorSettings {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            command_timeout: config.command_timeout(),
        }
    }
}

/// Runs closures against a world owned by a dedicated thread.
pub struct SimulationExecutor<W> {
    inbox: Sender<Message<W>>,
    accepting: AtomicBool,
    thread_id: ThreadId,
    command_timeout: Option<Duration>,
    finished: Receiver<()>,
    worker: Mutex<Option<JoinHandle<W>>>,
}

impl<W: World> SimulationExecutor<W> {
    /// Moves `world` onto a new simulation thread.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Spawn`] when the thread cannot be created.
    pub fn spawn(world: W, settings: ExecutorSettings) -> Result<Self, ExecutorError> {
        let (inbox, queue) = crossbeam_channel::unbounded();
        let (finish, finished) = crossbeam_channel::bounded(1);
        let tick_interval = settings.tick_interval;
        let worker = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || {
                let world = run_loop(world, &queue, tick_interval);
                if finish.send(()).is_err() {
                    debug!(target: EXECUTOR_TARGET, "executor dropped before drain finished");
                }
                world
            })
            .map_err(ExecutorError::Spawn)?;
        info!(
            target: EXECUTOR_TARGET,
            tick_ms = tick_interval.map(|interval| interval.as_millis()),
            timeout_ms = settings.command_timeout.map(|limit| limit.as_millis()),
            "simulation thread started"
        );
        Ok(Self {
            inbox,
            accepting: AtomicBool::new(true),
            thread_id: worker.thread().id(),
            command_timeout: settings.command_timeout,
            finished,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Runs `work` on the simulation thread and returns its result.
    ///
    /// Work items run in the order they were submitted. The calling thread
    /// blocks until `work` finishes, or until the command timeout elapses when
    /// one is configured. Work is never cancelled once queued.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::Unavailable`] once shutdown has begun.
    /// - [`ExecutorError::Reentrant`] when called from the simulation thread.
    /// - [`ExecutorError::Fault`] when `work` panics.
    /// - [`ExecutorError::TimedOut`] when the configured bound elapses.
    pub fn submit<F, T>(&self, work: F) -> Result<T, ExecutorError>
    where
        F: FnOnce(&mut W) -> T + Send + 'static,
        T: Send + 'static,
    {
        if thread::current().id() == self.thread_id {
            return Err(ExecutorError::Reentrant);
        }
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(ExecutorError::Unavailable);
        }

        let (slot, result) = crossbeam_channel::bounded(1);
        let job: Job<W> = Box::new(move |world: &mut W| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(world)))
                .map_err(|payload| panic_message(payload.as_ref()));
            if slot.send(outcome).is_err() {
                debug!(target: EXECUTOR_TARGET, "caller stopped waiting for result");
            }
        });
        self.inbox
            .send(Message::Run(job))
            .map_err(|_| ExecutorError::Unavailable)?;

        let received = match self.command_timeout {
            Some(limit) => result.recv_timeout(limit).map_err(|error| match error {
                RecvTimeoutError::Timeout => ExecutorError::TimedOut { limit },
                RecvTimeoutError::Disconnected => ExecutorError::Unavailable,
            })?,
            None => result.recv().map_err(|_| ExecutorError::Unavailable)?,
        };
        received.map_err(|message| ExecutorError::Fault { message })
    }

    /// Returns whether new work is accepted.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Stops intake, lets queued work finish in order, and joins the thread.
    ///
    /// Returns the world once the thread has exited within `grace`.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::Unavailable`] when already shut down.
    /// - [`ExecutorError::TimedOut`] when draining outlives `grace`; the thread
    ///   is left to finish on its own.
    /// - [`ExecutorError::Fault`] when the thread itself panicked.
    pub fn shutdown(&self, grace: Duration) -> Result<W, ExecutorError> {
        self.accepting.store(false, Ordering::SeqCst);
        let Some(worker) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Err(ExecutorError::Unavailable);
        };
        if self.inbox.send(Message::Stop).is_err() {
            debug!(target: EXECUTOR_TARGET, "simulation thread already exited");
        }
        match self.finished.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    target: EXECUTOR_TARGET,
                    grace_ms = grace.as_millis(),
                    "simulation thread did not drain in time"
                );
                return Err(ExecutorError::TimedOut { limit: grace });
            }
        }
        let world = worker.join().map_err(|payload| ExecutorError::Fault {
            message: panic_message(payload.as_ref()),
        })?;
        info!(target: EXECUTOR_TARGET, "simulation thread stopped");
        Ok(world)
    }
}

impl<W> Drop for SimulationExecutor<W> {
    fn drop(&mut self) {
        if self.accepting.swap(false, Ordering::SeqCst) && self.inbox.send(Message::Stop).is_err()
        {
            debug!(target: EXECUTOR_TARGET, "simulation thread exited before the stop request");
        }
    }
}

fn run_loop<W: World>(
    mut world: W,
    queue: &Receiver<Message<W>>,
    tick_interval: Option<Duration>,
) -> W {
    let mut next_tick = tick_interval.map(|interval| Instant::now() + interval);
    loop {
        let received = match (next_tick, tick_interval) {
            (Some(deadline), Some(interval)) => match queue.recv_deadline(deadline) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => {
                    world.tick();
                    let now = Instant::now();
                    let following = deadline + interval;
                    next_tick = Some(if following < now { now + interval } else { following });
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
            _ => queue.recv().ok(),
        };
        match received {
            Some(Message::Run(job)) => job(&mut world),
            Some(Message::Stop) | None => break,
        }
    }
    drain(&mut world, queue);
    world
}

/// Runs work that was queued before the stop request.
fn drain<W>(world: &mut W, queue: &Receiver<Message<W>>) {
    for message in queue.try_iter() {
        if let Message::Run(job) = message {
            job(world);
        }
    }
}

/// Extracts readable text from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("unknown panic"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::world::{Block, BlockPos, Material, MemoryWorld};

    #[fixture]
    fn executor() -> SimulationExecutor<MemoryWorld> {
        SimulationExecutor::spawn(MemoryWorld::default(), ExecutorSettings::default())
            .expect("spawn executor")
    }

    #[rstest]
    fn submit_returns_the_work_result(executor: SimulationExecutor<MemoryWorld>) {
        let placed = executor.submit(|world| {
            world.set_block(BlockPos::new(1, 2, 3), Block::plain(Material::Stone));
            world.block_count()
        });
        assert_eq!(placed.ok(), Some(1));
    }

    #[rstest]
    fn work_runs_on_the_simulation_thread(executor: SimulationExecutor<MemoryWorld>) {
        let name = executor
            .submit(|_| thread::current().name().map(str::to_owned))
            .expect("submit");
        assert_eq!(name.as_deref(), Some(THREAD_NAME));
    }

    #[rstest]
    fn panics_are_resurfaced_as_faults(executor: SimulationExecutor<MemoryWorld>) {
        let result = executor.submit(|_| -> u8 { panic!("kaboom") });
        assert!(
            matches!(result, Err(ExecutorError::Fault { ref message }) if message == "kaboom"),
            "unexpected result: {result:?}"
        );
        assert_eq!(executor.submit(|_| 7).ok(), Some(7), "executor should survive");
    }

    #[rstest]
    fn nested_submission_is_rejected() {
        let executor = Arc::new(
            SimulationExecutor::spawn(MemoryWorld::default(), ExecutorSettings::default())
                .expect("spawn executor"),
        );
        let inner = Arc::clone(&executor);
        let nested = executor
            .submit(move |_| matches!(inner.submit(|_| ()), Err(ExecutorError::Reentrant)))
            .expect("outer submit");
        assert!(nested, "nested submit should report re-entrancy");
    }

    #[rstest]
    fn slow_work_times_out_without_cancellation() {
        let settings = ExecutorSettings {
            tick_interval: None,
            command_timeout: Some(Duration::from_millis(20)),
        };
        let executor =
            SimulationExecutor::spawn(MemoryWorld::default(), settings).expect("spawn executor");

        let slow = executor.submit(|world| {
            thread::sleep(Duration::from_millis(200));
            world.set_block(BlockPos::new(0, 0, 0), Block::plain(Material::Stone));
        });

        assert!(matches!(slow, Err(ExecutorError::TimedOut { .. })), "{slow:?}");
        let world = executor.shutdown(Duration::from_secs(2)).expect("shutdown");
        assert_eq!(world.block_count(), 1, "timed-out work still completes");
    }

    #[rstest]
    fn submissions_after_shutdown_fail_fast(executor: SimulationExecutor<MemoryWorld>) {
        executor.shutdown(Duration::from_secs(1)).expect("shutdown");
        assert!(!executor.is_accepting());
        assert!(matches!(
            executor.submit(|_| ()),
            Err(ExecutorError::Unavailable)
        ));
        assert!(matches!(
            executor.shutdown(Duration::from_secs(1)),
            Err(ExecutorError::Unavailable)
        ));
    }

    #[rstest]
    fn shutdown_drains_queued_work_in_order() {
        let executor = Arc::new(
            SimulationExecutor::spawn(MemoryWorld::default(), ExecutorSettings::default())
                .expect("spawn executor"),
        );
        let (started_tx, started_rx) = mpsc::channel();
        let blocker = Arc::clone(&executor);
        let first = thread::spawn(move || {
            blocker.submit(move |world| {
                started_tx.send(()).expect("signal start");
                thread::sleep(Duration::from_millis(50));
                world.set_time(100);
            })
        });
        started_rx.recv().expect("first job started");
        let queued = Arc::clone(&executor);
        let second = thread::spawn(move || {
            queued.submit(|world| {
                let before = world.time();
                world.set_time(before + 1);
                before
            })
        });
        thread::sleep(Duration::from_millis(10));

        let world = executor.shutdown(Duration::from_secs(2)).expect("shutdown");

        assert!(first.join().expect("join first").is_ok());
        assert_eq!(second.join().expect("join second").ok(), Some(100));
        assert_eq!(world.time(), 101);
    }

    fn wait_for_queued(executor: &SimulationExecutor<MemoryWorld>, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while executor.inbox.len() < expected {
            assert!(Instant::now() < deadline, "submission {expected} was never queued");
            thread::yield_now();
        }
    }

    #[rstest]
    fn submissions_from_many_threads_run_in_arrival_order() {
        const SUBMITTERS: usize = 8;
        let executor = Arc::new(
            SimulationExecutor::spawn(MemoryWorld::default(), ExecutorSettings::default())
                .expect("spawn executor"),
        );
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gated = Arc::clone(&executor);
        let gate = thread::spawn(move || {
            gated.submit(move |_| {
                started_tx.send(()).expect("signal start");
                gate_rx.recv().expect("gate released");
            })
        });
        started_rx.recv().expect("gated job started");

        let log = Arc::new(Mutex::new(Vec::new()));
        let submitters: Vec<_> = (0..SUBMITTERS)
            .map(|index| {
                let submitting = Arc::clone(&executor);
                let log = Arc::clone(&log);
                let submitter = thread::spawn(move || {
                    submitting.submit(move |_| {
                        log.lock().expect("log mutex").push(index);
                    })
                });
                wait_for_queued(&executor, index + 1);
                submitter
            })
            .collect();

        gate_tx.send(()).expect("release gate");
        gate.join().expect("join gate").expect("gated job");
        for submitter in submitters {
            submitter.join().expect("join submitter").expect("submit");
        }

        let order = log.lock().expect("log mutex").clone();
        assert_eq!(order, (0..SUBMITTERS).collect::<Vec<_>>());
    }

    fn detached_executor(
        inbox: Sender<Message<MemoryWorld>>,
    ) -> SimulationExecutor<MemoryWorld> {
        let (_, finished) = crossbeam_channel::bounded(1);
        SimulationExecutor {
            inbox,
            accepting: AtomicBool::new(true),
            thread_id: thread::current().id(),
            command_timeout: None,
            finished,
            worker: Mutex::new(None),
        }
    }

    #[rstest]
    fn dropping_an_accepting_executor_requests_a_stop() {
        let (inbox, queue) = crossbeam_channel::unbounded();

        drop(detached_executor(inbox));

        assert!(matches!(queue.try_recv(), Ok(Message::Stop)));
    }

    #[rstest]
    fn dropping_after_the_thread_exited_is_quiet() {
        let (inbox, queue) = crossbeam_channel::unbounded();
        drop(queue);

        drop(detached_executor(inbox));
    }

    #[rstest]
    fn ticks_advance_the_world_between_work() {
        let settings = ExecutorSettings {
            tick_interval: Some(Duration::from_millis(1)),
            command_timeout: None,
        };
        let executor =
            SimulationExecutor::spawn(MemoryWorld::default(), settings).expect("spawn executor");
        thread::sleep(Duration::from_millis(50));
        let time = executor.submit(|world| world.time()).expect("submit");
        assert!(time > 0, "world should have ticked");
    }

    #[rstest]
    #[case(Box::new("static text") as Box<dyn Any + Send>, "static text")]
    #[case(Box::new(String::from("owned text")) as Box<dyn Any + Send>, "owned text")]
    #[case(Box::new(42_u32) as Box<dyn Any + Send>, "unknown panic")]
    fn panic_payloads_are_described(#[case] payload: Box<dyn Any + Send>, #[case] expected: &str) {
        assert_eq!(panic_message(payload.as_ref()), expected);
    }
}
