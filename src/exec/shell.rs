use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::error::ExecError;

/// Outcome of one script run or git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_status: Option<i32>,
    /// No process was spawned; `stderr` holds the reason.
    pub skipped: bool,
    pub timed_out: bool,
    /// The process owned the terminal, so its output was not captured.
    pub interactive: bool,
}

impl ExecutionResult {
    /// A result for something that was deliberately not run.
    pub fn skipped(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stderr: reason.into(),
            skipped: true,
            ..Default::default()
        }
    }

    /// A result for a process that could not be spawned or awaited.
    pub fn failed(command: impl Into<String>, error: &ExecError) -> Self {
        Self {
            command: command.into(),
            stderr: error.to_string(),
            ..Default::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        !self.skipped && !self.timed_out && self.exit_status == Some(0)
    }

    /// Human-readable block used in the report handed back to the model.
    pub fn summary(&self) -> String {
        let status = if self.skipped {
            "skipped".to_string()
        } else if self.timed_out {
            "timed out".to_string()
        } else {
            match self.exit_status {
                Some(code) => format!("exit {code}"),
                None => "terminated by signal".to_string(),
            }
        };

        let mut out = format!("$ {}\nstatus: {status}\n", self.command);
        if self.interactive {
            out.push_str("(interactive session; output went to the terminal)\n");
        }
        if !self.stdout.trim().is_empty() {
            out.push_str(&format!("stdout:\n{}\n", self.stdout.trim_end()));
        }
        if !self.stderr.trim().is_empty() {
            out.push_str(&format!("stderr:\n{}\n", self.stderr.trim_end()));
        }
        out
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>, buf: &mut Vec<u8>) {
    if let Some(mut reader) = reader {
        if let Err(e) = reader.read_to_end(buf).await {
            tracing::debug!("Output pipe closed early: {e}");
        }
    }
}

/// Run `program args...` in `cwd` with stdin closed and both output streams
/// captured.
///
/// The child gets its own process group. When `timeout` elapses, the whole
/// group is killed and the result is marked `timed_out` with whatever output
/// arrived before the deadline.
pub async fn run_captured(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Option<Duration>,
) -> Result<ExecutionResult, ExecError> {
    let command_line = std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecError::SpawnFailed {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    let pid = child.id();
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let finished = {
        let run = async {
            let (status, (), ()) = tokio::join!(
                child.wait(),
                drain(stdout_pipe, &mut stdout),
                drain(stderr_pipe, &mut stderr),
            );
            status
        };
        match timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.ok(),
            None => Some(run.await),
        }
    };

    let (exit_status, timed_out) = match finished {
        Some(status) => {
            let status = status.map_err(|e| ExecError::ProcessFailed(e.to_string()))?;
            (status.code(), false)
        }
        None => {
            tracing::warn!(command = %command_line, "Process timed out; killing its group");
            if let Some(pid) = pid {
                let pgid = nix::unistd::Pid::from_raw(pid as i32);
                let _ = nix::sys::signal::killpg(pgid, nix::sys::signal::Signal::SIGKILL);
            }
            // Reap the child to prevent zombies.
            let _ = child.wait().await;
            (None, true)
        }
    };

    Ok(ExecutionResult {
        command: command_line,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_status,
        skipped: false,
        timed_out,
        interactive: false,
    })
}
