//! Out-of-process isolation: a child `taskitem host` speaking JSON lines.

use std::{
    ffi::OsStr,
    io::{BufRead, BufReader},
    path::Path,
    process::{Child, ChildStdin, Command, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use tracing::{debug, warn};

use super::{
    protocol::{write_message, HostRequest, HostResponse},
    IsolationBoundary,
};
use crate::{config::Config, Error, Result};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Child process hosting items, reached through its stdin and stdout.
#[derive(Debug)]
pub struct ProcessBoundary {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
    timeout: Duration,
    released: bool,
    /// Set once an exchange goes unanswered; a late reply would pair with
    /// the wrong request, so no further exchanges are attempted.
    failure: Option<String>,
}

impl ProcessBoundary {
    /// Start `program host` as the far side.
    ///
    /// # Errors
    ///
    /// Returns a boundary error if the program cannot be started.
    pub fn spawn(program: impl AsRef<OsStr>, timeout: Duration) -> Result<Self> {
        let mut command = Command::new(program.as_ref());
        command.arg("host");
        Self::spawn_command(command, timeout)
    }

    /// Start the configured host program.
    ///
    /// # Errors
    ///
    /// Returns a config error if no host program is configured, or a boundary
    /// error if it cannot be started.
    pub fn from_config(config: &Config) -> Result<Self> {
        let program = config
            .boundary
            .host_program
            .as_deref()
            .ok_or_else(|| Error::config("boundary.host_program is not set"))?;

        let mut command = Command::new(program);
        command.arg("host");
        if let Some(dir) = &config.working_dir {
            command.arg("--working-dir").arg(dir);
        }
        Self::spawn_command(command, Duration::from_millis(config.boundary.timeout_ms))
    }

    fn spawn_command(mut command: Command, timeout: Duration) -> Result<Self> {
        let program = Path::new(command.get_program()).display().to_string();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::boundary(format!("failed to start item host {program}: {e}")))?;

        let stdin = child.stdin.take();
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(Error::boundary("item host stdout was not captured"));
        };

        let (line_tx, line_rx) = unbounded();
        let reader = thread::Builder::new()
            .name("taskitem-host-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    match line {
                        Ok(line) if line.trim().is_empty() => {}
                        Ok(line) => {
                            if line_tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to read from item host: {e}");
                            break;
                        }
                    }
                }
            });
        let reader = match reader {
            Ok(reader) => reader,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::boundary(format!("failed to start host reader: {e}")));
            }
        };

        debug!(program = %program, pid = child.id(), "item host started");
        Ok(Self {
            child,
            stdin,
            lines: line_rx,
            reader: Some(reader),
            timeout,
            released: false,
            failure: None,
        })
    }

    /// Wait up to the exchange timeout for the child to exit, then kill it.
    fn reap(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                debug!(%status, "item host exited");
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!("Item host ignored shutdown, killing it");
                self.child.kill()?;
                self.child.wait()?;
                return Ok(());
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}

impl IsolationBoundary for ProcessBoundary {
    fn exchange(&mut self, request: &HostRequest) -> Result<HostResponse> {
        if let Some(failure) = &self.failure {
            return Err(Error::boundary(format!(
                "item host unusable after earlier failure: {failure}"
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::boundary("item host already torn down"))?;

        write_message(stdin, request)
            .map_err(|e| Error::boundary(format!("item host stopped accepting requests: {e}")))?;

        let line = match self.lines.recv_timeout(self.timeout) {
            Ok(line) => line,
            Err(e) => {
                let failure = match e {
                    RecvTimeoutError::Timeout => format!(
                        "item host did not answer within {}ms",
                        self.timeout.as_millis()
                    ),
                    RecvTimeoutError::Disconnected => {
                        "item host exited before answering".to_string()
                    }
                };
                // End of input tells the host to stop after its current request.
                drop(self.stdin.take());
                self.failure = Some(failure.clone());
                return Err(Error::boundary(failure));
            }
        };

        Ok(serde_json::from_str(&line)?)
    }

    fn teardown(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if let Some(mut stdin) = self.stdin.take() {
            // A host that already exited has closed the pipe; reaping still applies.
            if let Err(e) = write_message(&mut stdin, &HostRequest::Shutdown) {
                debug!("Shutdown request not delivered: {e}");
            }
        }

        let reaped = self.reap();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("Item host reader thread panicked");
            }
        }
        reaped.map_err(|e| Error::boundary(format!("failed to stop item host: {e}")))
    }
}

impl Drop for ProcessBoundary {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!("Failed to stop item host: {e}");
        }
    }
}
