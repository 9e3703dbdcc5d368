//! Subprocess spawning with stream capture and an optional timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output past this limit is read and discarded, so the child never sees a
/// closed pipe.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// Reasons a child could not be run to completion.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error while waiting for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Process timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

/// Spawn `cmd`, capture stdout/stderr, and wait for exit.
///
/// With `timeout = None` the wait is unbounded. On timeout the child is
/// killed (`kill_on_drop`).
pub async fn run_command(
    cmd: &mut Command,
    timeout: Option<Duration>,
) -> Result<ProcessOutput, ProcessError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(ProcessError::Spawn)?;

    // Read the streams in their own tasks so `child.wait()` can borrow
    // `&mut child` and a chatty process never blocks on a full pipe.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(waited) => waited.map_err(ProcessError::Wait)?,
            Err(_elapsed) => {
                // `child` is dropped on return, which kills it.
                return Err(ProcessError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
        },
        None => child.wait().await.map_err(ProcessError::Wait)?,
    };

    let stdout_bytes = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        exit_code: status.code(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Read an entire output stream, keeping the first [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}
