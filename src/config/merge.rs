use super::schema::{AppConfig, PartialConfig};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "qwen3-coder:latest";
pub const DEFAULT_TREE_DEPTH: usize = 3;
pub const DEFAULT_MAX_TREE_ENTRIES: usize = 200;
pub const DEFAULT_SCRIPT_EXTENSION: &str = "rb";
pub const DEFAULT_INTERPRETER: &str = "ruby";
pub const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 30;

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            model: self.model.or(fallback.model),
            workspace: self.workspace.or(fallback.workspace),
            tree_depth: self.tree_depth.or(fallback.tree_depth),
            max_tree_entries: self.max_tree_entries.or(fallback.max_tree_entries),
            script_extension: self.script_extension.or(fallback.script_extension),
            interpreter: self.interpreter.or(fallback.interpreter),
            script_timeout_secs: self.script_timeout_secs.or(fallback.script_timeout_secs),
            logging_enabled: self.logging_enabled.or(fallback.logging_enabled),
            session_log_dir: self.session_log_dir.or(fallback.session_log_dir),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    ///
    /// `default_log_dir` is used when logging is enabled but no directory was
    /// configured.
    pub fn finalize(self, default_log_dir: Option<PathBuf>) -> AppConfig {
        let session_log_dir = if self.logging_enabled.unwrap_or(true) {
            self.session_log_dir.or(default_log_dir)
        } else {
            None
        };

        AppConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            workspace: self.workspace.unwrap_or_else(|| PathBuf::from(".")),
            tree_depth: self.tree_depth.unwrap_or(DEFAULT_TREE_DEPTH),
            max_tree_entries: self.max_tree_entries.unwrap_or(DEFAULT_MAX_TREE_ENTRIES),
            script_extension: self
                .script_extension
                .unwrap_or_else(|| DEFAULT_SCRIPT_EXTENSION.to_string()),
            interpreter: self
                .interpreter
                .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
            script_timeout_secs: self
                .script_timeout_secs
                .unwrap_or(DEFAULT_SCRIPT_TIMEOUT_SECS),
            session_log_dir,
        }
    }
}
