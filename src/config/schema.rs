use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The TOML file structure for vibecode.toml.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts: Option<ScriptsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct GeneralConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct AgentConfig {
    /// Directory depth of the project tree snapshot sent to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_depth: Option<usize>,
    /// Maximum number of tree entries sent to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tree_entries: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ScriptsConfig {
    /// Extension (without the dot) of files the agent may run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Program used to run scripts, e.g. "ruby".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
    /// Timeout for non-interactive script runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Directory for JSONL session transcripts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// Fully-resolved runtime configuration. All fields have values.
///
/// Passed explicitly into the orchestrator; there is no global model state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub workspace: PathBuf,
    pub tree_depth: usize,
    pub max_tree_entries: usize,
    pub script_extension: String,
    pub interpreter: String,
    pub script_timeout_secs: u64,
    /// `None` disables the session transcript.
    pub session_log_dir: Option<PathBuf>,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub model: Option<String>,
    pub workspace: Option<PathBuf>,
    pub tree_depth: Option<usize>,
    pub max_tree_entries: Option<usize>,
    pub script_extension: Option<String>,
    pub interpreter: Option<String>,
    pub script_timeout_secs: Option<u64>,
    pub logging_enabled: Option<bool>,
    pub session_log_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Flatten the sectioned file layout into a mergeable partial config.
    pub fn to_partial(&self) -> PartialConfig {
        let general = self.general.as_ref();
        let agent = self.agent.as_ref();
        let scripts = self.scripts.as_ref();
        let logging = self.logging.as_ref();

        PartialConfig {
            model: general.and_then(|g| g.model.clone()),
            workspace: general
                .and_then(|g| g.workspace.as_ref())
                .map(PathBuf::from),
            tree_depth: agent.and_then(|a| a.tree_depth),
            max_tree_entries: agent.and_then(|a| a.max_tree_entries),
            script_extension: scripts
                .and_then(|s| s.extension.as_ref())
                .map(|ext| ext.trim_start_matches('.').to_string()),
            interpreter: scripts.and_then(|s| s.interpreter.clone()),
            script_timeout_secs: scripts.and_then(|s| s.timeout_secs),
            logging_enabled: logging.and_then(|l| l.enabled),
            session_log_dir: logging
                .and_then(|l| l.dir.as_ref())
                .map(PathBuf::from),
        }
    }
}
