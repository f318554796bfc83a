use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::{AdvisorError, CancelToken, EngineConfig};

/// How often a blocked read wakes up to look at the cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long the engine gets to exit by itself after its stdin is closed.
const EXIT_GRACE: Duration = Duration::from_millis(200);

/// A running analysis engine, talking line by line over its stdin and stdout.
///
/// Stdout is drained by a reader thread, so reads can time out. The process
/// is killed when this is dropped.
pub struct EngineProcess {
    pub name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<std::io::Result<String>>,
}

impl EngineProcess {
    pub fn spawn(config: &EngineConfig) -> Result<Self, AdvisorError> {
        let spawn_failed = |err| AdvisorError::SpawnFailed {
            cmd: config.cmd.clone(),
            err,
        };
        let mut child = Command::new(&config.cmd)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_failed)?;

        let missing_pipe = || std::io::Error::new(std::io::ErrorKind::BrokenPipe, "no pipe");
        let stdin = child.stdin.take().ok_or_else(|| spawn_failed(missing_pipe()))?;
        let stdout = child.stdout.take().ok_or_else(|| spawn_failed(missing_pipe()))?;

        let (sender, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let failed = line.is_err();
                // The receiver is gone once the engine is shut down
                if sender.send(line).is_err() || failed {
                    break;
                }
            }
        });

        debug!(engine = &config.nick, pid = child.id(), "Started engine");
        Ok(Self {
            name: config.nick.clone(),
            child,
            stdin: Some(stdin),
            lines,
        })
    }

    pub fn send(&mut self, command: &str) -> Result<(), AdvisorError> {
        trace!(name: "Sending command", engine = &self.name, command);
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            AdvisorError::EngineIo(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin already closed",
            ))
        })?;
        stdin.write_all(command.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }

    /// Waits for the next line of output. Returns `None` at end of output.
    pub fn read_line(
        &self,
        deadline: Instant,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<String>, AdvisorError> {
        loop {
            if cancel.is_cancelled() {
                return Err(AdvisorError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(AdvisorError::Timeout { after: timeout });
            }
            match self.lines.recv_timeout(POLL_INTERVAL.min(deadline - now)) {
                Ok(Ok(line)) => {
                    trace!(name: "Received line", engine = &self.name, line = %line);
                    return Ok(Some(line));
                }
                Ok(Err(err)) => return Err(AdvisorError::EngineIo(err)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }

    /// Closes stdin and gives the engine a moment to quit before killing it.
    pub fn shutdown(mut self) {
        self.terminate();
    }

    fn terminate(&mut self) {
        drop(self.stdin.take());
        let give_up = Instant::now() + EXIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(engine = &self.name, %status, "Engine exited");
                    return;
                }
                Ok(None) if Instant::now() < give_up => thread::sleep(Duration::from_millis(10)),
                Ok(None) => break,
                Err(err) => {
                    warn!(engine = &self.name, %err, "Could not query engine status");
                    break;
                }
            }
        }
        if let Err(err) = self.child.kill() {
            warn!(engine = &self.name, %err, "Could not kill engine");
        }
        // Reap it, so no zombie is left behind
        let _ = self.child.wait();
        debug!(engine = &self.name, "Engine killed");
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            self.terminate();
        }
    }
}
