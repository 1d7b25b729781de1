use std::path::{Path, PathBuf};

use super::shell::{run_captured, ExecutionResult};
use crate::safety::command_filter::{classify_command, TrustTier, VCS_PROGRAM};
use crate::ui::Operator;

/// Runs classified git commands in the workspace root.
pub struct GitRunner {
    root: PathBuf,
}

impl GitRunner {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// True if the root lies inside a git work tree.
    pub async fn is_repository(&self) -> bool {
        let args = ["rev-parse".to_string(), "--is-inside-work-tree".to_string()];
        match run_captured(VCS_PROGRAM, &args, &self.root, None).await {
            Ok(result) => result.succeeded() && result.stdout.trim() == "true",
            Err(e) => {
                tracing::debug!("git unavailable: {e}");
                false
            }
        }
    }

    /// Classify `command` and run it if its tier allows.
    ///
    /// `Rejected` never runs. Outside a work tree nothing runs and nothing is
    /// asked. `Safe` runs straight away; `Confirm` asks the operator once, and
    /// a decline skips only this command. Git is invoked directly, without a
    /// shell; the caller displays the result.
    pub async fn run<O: Operator + ?Sized>(&self, command: &str, operator: &mut O) -> ExecutionResult {
        let command = command.trim();
        let (words, tier) = classify_command(command);

        if tier == TrustTier::Rejected {
            tracing::warn!(command, "Rejected non-git command");
            return ExecutionResult::skipped(command, "Only git commands are allowed");
        }
        if !self.is_repository().await {
            return ExecutionResult::skipped(command, "not a git repository");
        }
        if tier == TrustTier::Confirm && !operator.confirm(&format!("Run `{command}`?")) {
            tracing::info!(command, "Git command declined");
            return ExecutionResult::skipped(command, "Command cancelled");
        }

        let result = match run_captured(VCS_PROGRAM, &words[1..], &self.root, None).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(command, "Git command failed to run: {e}");
                ExecutionResult::failed(command, &e)
            }
        };
        tracing::info!(command, tier = ?tier, exit = ?result.exit_status, "Git command finished");
        result
    }
}
