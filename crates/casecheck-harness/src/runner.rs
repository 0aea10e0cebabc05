//! Process runner: spawn a command, feed stdin, capture stdout/stderr.
//!
//! stdin is written on its own thread and stdout/stderr are drained on two
//! more, so payloads larger than the pipe buffer cannot deadlock against a
//! child that writes before it finishes reading. A timeout covers the wait
//! and the draining of the pipes, which a background descendant may hold open.
//!
//! Exit code convention:
//! - normal exit: the child's code
//! - killed by signal `n` (unix): `128 + n`
//! - anything else: [`ABNORMAL_EXIT_CODE`]

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use casecheck_core::ProcessOutput;
use serde::Serialize;
use thiserror::Error;
use wait_timeout::ChildExt;

/// Offset added to a terminating signal number.
pub const SIGNAL_EXIT_BASE: i32 = 128;
/// Reported when a status carries neither an exit code nor a signal.
pub const ABNORMAL_EXIT_CODE: i32 = 255;

/// Captured stream of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("empty command: nothing to execute")]
    EmptyCommand,
    #[error("failed to launch {program:?}: {reason}")]
    LaunchFailed { program: String, reason: String },
    #[error("{stream} is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { stream: Stream, valid_up_to: usize },
    #[error("process did not finish within {timeout_ms} ms and was killed")]
    Timeout { timeout_ms: u128 },
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Upper bound on the whole run, including draining output held open by
    /// background descendants. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Run `command[0]` with `command[1..]`, writing `stdin` to it and collecting
/// its exit code and output as text.
pub fn run_process(
    command: &[String],
    stdin: &str,
    options: &RunOptions,
) -> Result<ProcessOutput, RunError> {
    let (program, args) = command.split_first().ok_or(RunError::EmptyCommand)?;

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| RunError::LaunchFailed {
            program: program.clone(),
            reason: err.to_string(),
        })?;
    let mut guard = ReapOnDrop {
        child,
        reaped: false,
    };

    let deadline = options.timeout.map(|limit| (Instant::now() + limit, limit));

    let writer = guard
        .child
        .stdin
        .take()
        .map(|pipe| spawn_writer(pipe, stdin.as_bytes().to_vec()));
    let stdout = guard.child.stdout.take().map(spawn_reader);
    let stderr = guard.child.stderr.take().map(spawn_reader);

    let status = match deadline {
        Some((at, limit)) => {
            match guard
                .child
                .wait_timeout(at.saturating_duration_since(Instant::now()))?
            {
                Some(status) => status,
                None => {
                    guard.kill_and_reap();
                    return Err(timed_out(limit));
                }
            }
        }
        None => guard.child.wait()?,
    };
    guard.reaped = true;

    // A background grandchild can keep the pipes open after the child exits,
    // so draining them is bounded by the same deadline as the wait. Pipe
    // threads still blocked at that point are detached.
    let written = match writer {
        Some(rx) => drain(rx, deadline)?,
        None => Ok(()),
    };
    let stdout = match stdout {
        Some(rx) => drain(rx, deadline)??,
        None => Vec::new(),
    };
    let stderr = match stderr {
        Some(rx) => drain(rx, deadline)??,
        None => Vec::new(),
    };
    // A child that exits without reading all of stdin closes the pipe under us.
    match written {
        Err(err) if err.kind() != io::ErrorKind::BrokenPipe => return Err(err.into()),
        _ => {}
    }

    Ok(ProcessOutput {
        exit_code: exit_code_of(status),
        stdout: into_text(stdout, Stream::Stdout)?,
        stderr: into_text(stderr, Stream::Stderr)?,
    })
}

fn timed_out(limit: Duration) -> RunError {
    RunError::Timeout {
        timeout_ms: limit.as_millis(),
    }
}

/// Wait for a pipe thread's result, giving up at the deadline if there is one.
fn drain<T>(
    rx: Receiver<io::Result<T>>,
    deadline: Option<(Instant, Duration)>,
) -> Result<io::Result<T>, RunError> {
    let received = match deadline {
        Some((at, limit)) => match rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => return Err(timed_out(limit)),
            Err(RecvTimeoutError::Disconnected) => Err(()),
        },
        None => rx.recv().map_err(|_| ()),
    };
    received.map_err(|()| RunError::Io(io::Error::other("pipe thread panicked")))
}

/// Kills and reaps the child unless it was already waited for.
struct ReapOnDrop {
    child: Child,
    reaped: bool,
}

impl ReapOnDrop {
    fn kill_and_reap(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
            self.reaped = true;
        }
    }
}

impl Drop for ReapOnDrop {
    fn drop(&mut self) {
        self.kill_and_reap();
    }
}

fn spawn_writer(
    mut pipe: impl Write + Send + 'static,
    payload: Vec<u8>,
) -> Receiver<io::Result<()>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = pipe.write_all(&payload).and_then(|()| pipe.flush());
        // Close the child's stdin before reporting.
        drop(pipe);
        let _ = tx.send(result);
    });
    rx
}

fn spawn_reader(mut pipe: impl Read + Send + 'static) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });
    rx
}

fn into_text(bytes: Vec<u8>, stream: Stream) -> Result<String, RunError> {
    String::from_utf8(bytes).map_err(|err| RunError::InvalidUtf8 {
        stream,
        valid_up_to: err.utf8_error().valid_up_to(),
    })
}

/// Numeric exit code following the module's convention.
#[must_use]
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return SIGNAL_EXIT_BASE + signal;
        }
    }
    ABNORMAL_EXIT_CODE
}
