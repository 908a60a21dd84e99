//! Child process execution with a deadline and bounded capture.
//!
//! Agent CLIs may stream large transcripts and read long prompts from stdin,
//! so stdin, stdout and stderr are all serviced on their own threads while the
//! parent waits on the deadline.

use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured output of a finished (or killed) child process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes dropped from stdout once the capture limit was reached.
    pub stdout_dropped: usize,
    /// Bytes dropped from stderr once the capture limit was reached.
    pub stderr_dropped: usize,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Human-readable transcript used for run logs.
    pub fn transcript(&self) -> String {
        let mut buf = String::from("=== stdout ===\n");
        buf.push_str(&String::from_utf8_lossy(&self.stdout));
        if self.stdout_dropped > 0 {
            buf.push_str(&format!("\n[stdout truncated {} bytes]\n", self.stdout_dropped));
        }
        buf.push_str("\n=== stderr ===\n");
        buf.push_str(&String::from_utf8_lossy(&self.stderr));
        if self.stderr_dropped > 0 {
            buf.push_str(&format!("\n[stderr truncated {} bytes]\n", self.stderr_dropped));
        }
        if self.timed_out {
            buf.push_str("\n[process timed out]\n");
        }
        buf
    }
}

/// Run `cmd` to completion or until `timeout`, feeding `stdin` if given.
///
/// At most `capture_limit` bytes of each output stream are kept; the rest is
/// drained and counted so the child never blocks on a full pipe.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), capture_limit))]
pub fn run_with_deadline(
    mut cmd: Command,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
    capture_limit: usize,
) -> Result<ProcessOutput> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdin_handle = match stdin {
        Some(input) => {
            let mut pipe = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("stdin was not piped"))?;
            // Dropping the pipe at the end of the thread closes the child's stdin.
            Some(thread::spawn(move || pipe.write_all(&input)))
        }
        None => None,
    };
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stdout_handle = thread::spawn(move || read_capped(stdout, capture_limit));
    let stderr_handle = thread::spawn(move || read_capped(stderr, capture_limit));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    if let Some(handle) = stdin_handle {
        match handle.join() {
            Ok(Ok(())) => {}
            // A child that exits without reading its whole prompt closes the pipe early.
            Ok(Err(err)) => debug!(err = %err, "stdin write ended early"),
            Err(_) => return Err(anyhow!("stdin writer thread panicked")),
        }
    }
    let (stdout, stdout_dropped) = join_reader(stdout_handle).context("join stdout")?;
    let (stderr, stderr_dropped) = join_reader(stderr_handle).context("join stderr")?;
    if stdout_dropped > 0 || stderr_dropped > 0 {
        warn!(stdout_dropped, stderr_dropped, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
        stdout_dropped,
        stderr_dropped,
        timed_out,
    })
}

fn join_reader(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_capped<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut kept = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len()).min(n);
        kept.extend_from_slice(&chunk[..room]);
        dropped += n - room;
    }
    Ok((kept, dropped))
}
