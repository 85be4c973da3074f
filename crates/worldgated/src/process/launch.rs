use std::ffi::OsString;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{RecvError, select};
use tracing::{debug, info};

use worldgate_config::{ConfigFile, default_config_path};

use crate::admin::{AdminShell, CommandSender, ConsoleSender};
use crate::auth::{ConfigTokenStore, TokenStore};
use crate::bootstrap::{ConfigLoader, FileConfigLoader, bootstrap_with};
use crate::gateway::{Gateway, GatewayContext};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::world::MemoryWorld;

use super::console::AdminConsole;
use super::errors::LaunchError;
use super::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
use super::{PROCESS_TARGET, StopReason};

/// Command line choices that shape a launch.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Configuration file; the default location when absent.
    pub config_path: Option<PathBuf>,
    /// Configuration flags layered over the file and environment.
    pub flags: Vec<OsString>,
}

/// Collaborators for one run of the gateway process.
pub(crate) struct LaunchPlan<S, R> {
    pub(crate) loader: Arc<dyn ConfigLoader>,
    pub(crate) token_store: Arc<dyn TokenStore>,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    pub(crate) console: Option<(R, Arc<dyn CommandSender>)>,
}

/// Runs the gateway until a termination signal or a console `stop`.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, start-up, signal handling, or
/// shutdown fails.
pub fn run_gateway(options: LaunchOptions) -> Result<(), LaunchError> {
    let file = ConfigFile::new(options.config_path.unwrap_or_else(default_config_path));
    let loader = FileConfigLoader::new(file.clone()).with_flags(options.flags);
    let console: Arc<dyn CommandSender> = Arc::new(ConsoleSender::stdout());
    let plan = LaunchPlan {
        loader: Arc::new(loader),
        token_store: Arc::new(ConfigTokenStore::new(file)),
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal,
        console: Some((BufReader::new(io::stdin()), console)),
    };
    run_gateway_with(plan).map(|_| ())
}

/// Runs the gateway with injected collaborators and returns why it stopped.
pub(crate) fn run_gateway_with<S, R>(plan: LaunchPlan<S, R>) -> Result<StopReason, LaunchError>
where
    S: ShutdownSignal,
    R: BufRead + Send + 'static,
{
    let LaunchPlan {
        loader,
        token_store,
        reporter,
        shutdown,
        console,
    } = plan;

    let config = bootstrap_with(loader.as_ref(), &reporter)?.config;
    let world = MemoryWorld::from_config(&config.world());
    let gateway = Arc::new(Gateway::new(GatewayContext {
        config,
        loader,
        token_store,
        world,
        reporter,
    })?);
    gateway.start()?;

    let (signal_tx, signal_rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name(String::from("worldgate-signals"))
        .spawn(move || {
            if signal_tx.send(shutdown.wait()).is_err() {
                debug!(target: PROCESS_TARGET, "signal observed after shutdown began");
            }
        })
        .map_err(|source| LaunchError::Spawn {
            role: "signal",
            source,
        })?;

    let (console_tx, console_rx) = crossbeam_channel::bounded(1);
    if let Some((input, sender)) = console {
        AdminConsole::new(AdminShell::new(Arc::clone(&gateway)), sender)
            .spawn(input, console_tx)
            .map_err(|source| LaunchError::Spawn {
                role: "console",
                source,
            })?;
    } else {
        drop(console_tx);
    }

    let reason = select! {
        recv(signal_rx) -> waited => signalled(waited)?,
        recv(console_rx) -> request => match request {
            Ok(reason) => reason,
            Err(_) => signalled(signal_rx.recv())?,
        },
    };
    info!(target: PROCESS_TARGET, ?reason, "stopping gateway");
    gateway.stop()?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(reason)
}

fn signalled(
    waited: Result<Result<(), ShutdownError>, RecvError>,
) -> Result<StopReason, LaunchError> {
    match waited {
        Ok(Ok(())) | Err(RecvError) => Ok(StopReason::Signal),
        Ok(Err(error)) => Err(error.into()),
    }
}
