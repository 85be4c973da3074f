use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::admin::{AdminShell, CommandSender};
use crate::world::World;

use super::{PROCESS_TARGET, StopReason};

/// Reads admin commands line by line and runs them through an [`AdminShell`].
///
/// Lines are the subcommand and its arguments, with or without a leading
/// `worldgate`. `stop` asks the process to shut down. End of input ends the
/// console but leaves the gateway running.
pub struct AdminConsole<W> {
    shell: AdminShell<W>,
    sender: Arc<dyn CommandSender>,
}

impl<W: World> AdminConsole<W> {
    /// Builds a console issuing commands as `sender`.
    #[must_use]
    pub const fn new(shell: AdminShell<W>, sender: Arc<dyn CommandSender>) -> Self {
        Self { shell, sender }
    }

    /// Runs one console line. Returns `true` when the operator asked to stop.
    pub fn interpret(&self, line: &str) -> bool {
        let mut words: Vec<&str> = line.split_whitespace().collect();
        if words
            .first()
            .is_some_and(|word| word.eq_ignore_ascii_case("worldgate"))
        {
            words.remove(0);
        } else if words.is_empty() {
            return false;
        }
        if let [word] = words.as_slice()
            && word.eq_ignore_ascii_case("stop")
        {
            return true;
        }
        self.shell.execute(self.sender.as_ref(), &words);
        false
    }

    /// Consumes `input` until end of input or `stop`.
    ///
    /// Returns `true` when the operator asked to stop.
    pub fn run<R: BufRead>(&self, input: R) -> bool {
        for line in input.lines() {
            match line {
                Ok(line) if self.interpret(&line) => return true,
                Ok(_) => {}
                Err(error) => {
                    warn!(target: PROCESS_TARGET, error = %error, "console input failed");
                    return false;
                }
            }
        }
        debug!(target: PROCESS_TARGET, "console input closed");
        false
    }

    /// Runs the console on its own thread, reporting `stop` through `stop`.
    ///
    /// # Errors
    ///
    /// Returns the spawn error when the thread cannot be created.
    pub fn spawn<R>(self, input: R, stop: Sender<StopReason>) -> io::Result<JoinHandle<()>>
    where
        R: BufRead + Send + 'static,
    {
        thread::Builder::new()
            .name(String::from("worldgate-console"))
            .spawn(move || {
                if self.run(input) && stop.send(StopReason::Console).is_err() {
                    debug!(target: PROCESS_TARGET, "stop requested after shutdown began");
                }
            })
    }
}
