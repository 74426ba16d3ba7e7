//! Process Runner
//!
//! Owns the lifecycle of one engine child process: spawn, drain both output
//! streams while waiting for exit, and classify the result.

use std::io;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::invocation::Invocation;
use super::types::ProcessOutcome;

/// Runs a built invocation to completion.
///
/// Implementations spawn exactly one child per call and never interpret
/// arguments through a shell.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation, cancel: &CancellationToken) -> ProcessOutcome;
}

/// Runner backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation, cancel: &CancellationToken) -> ProcessOutcome {
        if cancel.is_cancelled() {
            debug!(%invocation, "Cancelled before spawn");
            return ProcessOutcome::Cancelled;
        }

        let spawned = Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let cause = spawn_failure_message(invocation.program(), &e);
                warn!(program = %invocation.program(), error = %e, "Failed to spawn OCR engine");
                return ProcessOutcome::SpawnError { cause };
            }
        };
        debug!(pid = ?child.id(), %invocation, "OCR engine started");

        let collected = {
            let collect = collect_output(&mut child);
            tokio::pin!(collect);
            tokio::select! {
                result = &mut collect => Some(result),
                _ = cancel.cancelled() => None,
            }
        };

        let (status, stdout, stderr) = match collected {
            Some(Ok(parts)) => parts,
            Some(Err(e)) => {
                warn!(error = %e, "Lost contact with OCR engine");
                if let Err(kill_err) = child.kill().await {
                    debug!(error = %kill_err, "OCR engine already gone");
                }
                return ProcessOutcome::IoError {
                    cause: format!("Failed to collect OCR engine output: {e}"),
                };
            }
            None => {
                info!(pid = ?child.id(), "OCR run cancelled, killing engine");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill cancelled OCR engine");
                }
                return ProcessOutcome::Cancelled;
            }
        };

        if status.success() {
            debug!(
                stdout_bytes = stdout.len(),
                stderr_bytes = stderr.len(),
                "OCR engine completed"
            );
            ProcessOutcome::Completed { stdout, stderr }
        } else {
            warn!(
                exit_code = ?status.code(),
                stderr_bytes = stderr.len(),
                "OCR engine exited unsuccessfully"
            );
            ProcessOutcome::Failed {
                exit_code: status.code(),
                stdout,
                stderr,
            }
        }
    }
}

/// Drain stdout and stderr while waiting for exit. All three make progress
/// together, so a child blocked on a full pipe is always being read.
async fn collect_output(child: &mut Child) -> io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr, status) =
        tokio::try_join!(drain(stdout), drain(stderr), child.wait())?;

    Ok((status, stdout, stderr))
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

fn spawn_failure_message(program: &str, err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => {
            format!("Failed to start OCR process: '{program}' was not found")
        }
        io::ErrorKind::PermissionDenied => {
            format!("Failed to start OCR process: permission denied for '{program}'")
        }
        _ => format!("Failed to start OCR process: {err}"),
    }
}
