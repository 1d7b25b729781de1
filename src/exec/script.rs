//! Script execution sandbox.
//!
//! Decides whether a file the agent just wrote should be run, and runs it
//! either with captured output or, for programs that read from the user,
//! with the terminal handed over.
//!
//! The runnability checks are text heuristics tuned for Ruby, not a parse.
//! A false positive can only run a file the operator has already approved,
//! because every run appears in the action plan.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use super::shell::{run_captured, ExecutionResult};
use super::terminal::{InterruptGuard, TerminalGuard};
use crate::config::AppConfig;
use crate::error::ExecError;

/// `if __FILE__ == $0` and its variants.
static MAIN_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__FILE__\s*==\s*\$(?:0|PROGRAM_NAME)|\$(?:0|PROGRAM_NAME)\s*==\s*__FILE__")
        .expect("valid main-guard regex")
});

/// Calls that write to standard output.
static OUTPUT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)(?:^|[\s;{(])(?:puts|print|printf|pp)\b|(?:^|[\s;{(])p[ (]["'\w:@$\[]|(?:\$stdout|STDOUT)\.(?:write|puts|print)"#,
    )
    .expect("valid output-call regex")
});

/// Reads from the user or takes over the terminal.
static INTERACTIVE_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bgets\b|\bSTDIN\b|\$stdin\b|\breadlines?\b|\bReadline\b|io/console|\bcurses\b|\bCurses\b|tty-(?:prompt|reader)|\bTTY::|\bgetch\b|\bnoecho\b",
    )
    .expect("valid interactive-input regex")
});

/// Last lines that only declare or close something.
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:end\b|[}\])]|class\b|module\b|def\b|require(?:_relative)?\b|include\b|extend\b|attr_\w+\b|private\b|public\b|protected\b|__END__|[A-Za-z_]\w*\s*(?:\|\||&&|[+\-*/])?=[^=~>])",
    )
    .expect("valid declaration regex")
});

/// True if `content` looks like a program meant to be run directly.
///
/// Positive on a main guard or any output call. Otherwise the last
/// non-blank, non-comment line decides: a bare expression or call means
/// executable, a declaration, assignment or closing `end`/`}` means library
/// code.
pub fn is_executable(content: &str) -> bool {
    if MAIN_GUARD.is_match(content) || OUTPUT_CALL.is_match(content) {
        return true;
    }

    let mut in_block_comment = false;
    let mut last = None;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("=begin") {
            in_block_comment = true;
            continue;
        }
        if trimmed.starts_with("=end") {
            in_block_comment = false;
            continue;
        }
        if in_block_comment || trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        last = Some(trimmed);
    }

    match last {
        Some(line) => !DECLARATION.is_match(line),
        None => false,
    }
}

/// True if `content` reads standard input or drives the terminal directly.
pub fn is_interactive(content: &str) -> bool {
    INTERACTIVE_INPUT.is_match(content)
}

/// Runs scripts written during the current round.
pub struct ScriptSandbox {
    root: PathBuf,
    interpreter: String,
    extension: String,
    timeout: Duration,
}

impl ScriptSandbox {
    pub fn new(config: &AppConfig, root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            interpreter: config.interpreter.clone(),
            extension: config.script_extension.clone(),
            timeout: Duration::from_secs(config.script_timeout_secs),
        }
    }

    /// Command line shown in plans and reports for running `rel_path`.
    pub fn command_for(&self, rel_path: &str) -> String {
        format!("{} {}", self.interpreter, rel_path)
    }

    /// True if `rel_path` carries the script extension.
    pub fn has_script_extension(&self, rel_path: &str) -> bool {
        Path::new(rel_path)
            .extension()
            .is_some_and(|ext| ext == self.extension.as_str())
    }

    /// True if `rel_path` is a script that would be run if written.
    pub fn would_run(&self, rel_path: &str, content: &str) -> bool {
        self.has_script_extension(rel_path) && is_executable(content)
    }

    /// Run `rel_path` if it is a script written this round and looks
    /// runnable; otherwise return a skipped result without spawning
    /// anything.
    pub async fn run(
        &self,
        rel_path: &str,
        content: &str,
        written_this_round: &BTreeSet<String>,
    ) -> ExecutionResult {
        let command = self.command_for(rel_path);

        if !self.has_script_extension(rel_path) {
            return ExecutionResult::skipped(command, format!("not a .{} file", self.extension));
        }
        if !written_this_round.contains(rel_path) {
            return ExecutionResult::skipped(command, "file was not written this round");
        }
        if !is_executable(content) {
            return ExecutionResult::skipped(command, "file does not look runnable on its own");
        }

        let outcome = if is_interactive(content) {
            self.run_interactive(rel_path).await
        } else {
            run_captured(
                &self.interpreter,
                &[rel_path.to_string()],
                &self.root,
                Some(self.timeout),
            )
            .await
        };

        match outcome {
            Ok(result) => {
                tracing::info!(
                    command = %result.command,
                    exit = ?result.exit_status,
                    timed_out = result.timed_out,
                    "Script finished"
                );
                result
            }
            Err(e) => {
                tracing::warn!(command = %command, "Script failed to run: {e}");
                ExecutionResult::failed(command, &e)
            }
        }
    }

    /// Give the child the terminal until it exits. The terminal is restored
    /// by the guard on every path out of this function.
    async fn run_interactive(&self, rel_path: &str) -> Result<ExecutionResult, ExecError> {
        let command = self.command_for(rel_path);
        let _terminal = TerminalGuard::acquire();

        let mut child = Command::new(&self.interpreter)
            .arg(rel_path)
            .current_dir(&self.root)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::SpawnFailed {
                program: self.interpreter.clone(),
                message: e.to_string(),
            })?;

        // Ctrl-C reaches the child through the shared process group; the
        // agent ignores it only until the child exits.
        let status = {
            let _interrupts = InterruptGuard::ignore();
            child.wait().await
        }
        .map_err(|e| ExecError::ProcessFailed(e.to_string()))?;

        Ok(ExecutionResult {
            command,
            exit_status: status.code(),
            interactive: true,
            ..Default::default()
        })
    }
}
