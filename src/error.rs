use std::path::PathBuf;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    #[error("Could not determine the global config directory")]
    NoConfigDir,
}

/// Errors raised by the workspace guard.
///
/// `AccessDenied` is a sandbox escape and must abort the operation that caused
/// it. The other variants are reported upward as data.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Access outside the workspace is not allowed: `{path}` is not within `{workspace}`")]
    AccessDenied { path: String, workspace: PathBuf },

    #[error("File does not exist: {path}")]
    NotFound { path: String },

    #[error("I/O error on `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, WorkspaceError::AccessDenied { .. })
    }
}

/// Errors related to subprocess execution (scripts and git).
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to spawn `{program}`: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("Process execution failed: {0}")]
    ProcessFailed(String),
}

/// Errors talking to the model server.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Ollama not reachable at {url}: {message}")]
    OllamaUnavailable { url: String, message: String },

    #[error("Model request failed: {0}")]
    Transport(String),

    #[error("Failed to pull model '{model}': {message}")]
    PullFailed { model: String, message: String },
}
