// ============================================================================
// File: src/session/container/process.rs
// ----------------------------------------------------------------------------
// Child process execution with a deadline, used to drive container CLIs.
// ============================================================================

use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::session::errors::{SessionError, SessionResult};
use crate::session::types::CommandResult;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run a command to completion, killing it if `timeout` elapses
///
/// `label` names the command in timeout errors. Output pipes are drained on
/// background threads so a chatty child cannot block on a full pipe. The
/// deadline also bounds collecting output: a background process that keeps
/// the pipes open past it turns the call into a timeout.
pub fn run_with_timeout(
    mut cmd: Command,
    label: &str,
    timeout: Option<Duration>,
) -> SessionResult<CommandResult> {
    let start = Instant::now();

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| SessionError::Process {
        details: format!("Failed to spawn {label}: {e}"),
    })?;

    let deadline = timeout.map(|t| start + t);
    let (tx, rx) = mpsc::channel();
    let pending = drain(child.stdout.take(), Pipe::Stdout, &tx)
        + drain(child.stderr.take(), Pipe::Stderr, &tx);
    drop(tx);

    let timed_out = || SessionError::Timeout {
        command: label.to_string(),
        timeout: timeout.unwrap_or_default(),
    };

    let status = match wait_until(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(timed_out());
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
    };

    let (stdout, stderr) = collect(&rx, pending, deadline).map_err(|e| match e {
        CollectError::Deadline => timed_out(),
        CollectError::Failed(e) => e,
    })?;

    Ok(CommandResult::new(status.code().unwrap_or(-1), stdout, stderr)
        .with_duration(start.elapsed()))
}

/// Wait for exit; `Ok(None)` means the deadline passed first
fn wait_until(
    child: &mut Child,
    deadline: Option<Instant>,
) -> SessionResult<Option<std::process::ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some).map_err(|e| SessionError::Process {
            details: format!("Wait failed: {e}"),
        });
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) if Instant::now() >= deadline => return Ok(None),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(SessionError::Process {
                    details: format!("Wait failed: {e}"),
                });
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

type Drained = (Pipe, io::Result<String>);

/// Read a pipe to EOF on a thread; returns how many readers were started
fn drain<R: Read + Send + 'static>(
    pipe: Option<R>,
    kind: Pipe,
    tx: &Sender<Drained>,
) -> usize {
    let Some(mut pipe) = pipe else {
        return 0;
    };
    let tx = tx.clone();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let output = pipe
            .read_to_end(&mut buf)
            .map(|_| String::from_utf8_lossy(&buf).into_owned());
        // The receiver is gone once the caller gave up on the deadline.
        let _ = tx.send((kind, output));
    });
    1
}

enum CollectError {
    Deadline,
    Failed(SessionError),
}

fn collect(
    rx: &Receiver<Drained>,
    pending: usize,
    deadline: Option<Instant>,
) -> Result<(String, String), CollectError> {
    let reader_lost = || {
        CollectError::Failed(SessionError::Process {
            details: "Output reader exited without reporting".to_string(),
        })
    };

    let mut stdout = String::new();
    let mut stderr = String::new();
    for _ in 0..pending {
        let (kind, output) = match deadline {
            None => rx.recv().map_err(|_| reader_lost())?,
            Some(deadline) => rx
                .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .map_err(|e| match e {
                    RecvTimeoutError::Timeout => CollectError::Deadline,
                    RecvTimeoutError::Disconnected => reader_lost(),
                })?,
        };
        let output = output.map_err(|e| {
            CollectError::Failed(SessionError::Process {
                details: format!("Failed to read output: {e}"),
            })
        })?;
        match kind {
            Pipe::Stdout => stdout = output,
            Pipe::Stderr => stderr = output,
        }
    }
    Ok((stdout, stderr))
}
