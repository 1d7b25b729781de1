pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::Cli;
use crate::error::ConfigError;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// File name of the per-project config, looked up in the workspace root.
pub const WORKSPACE_CONFIG_FILE: &str = ".vibecode.toml";

/// Load configuration by merging global, workspace, and CLI sources.
/// Precedence: CLI > workspace config > global config > defaults.
///
/// Missing config files are handled gracefully (defaults apply).
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    // Layer 1: Global config (~/.config/vibecode/vibecode.toml), or --config.
    let global = match &cli.config {
        Some(path) => load_toml_file(path).unwrap_or_default(),
        None => load_global_config(),
    };

    // Determine workspace path from CLI or global config, for loading workspace config.
    let workspace_path = cli
        .workspace
        .clone()
        .or_else(|| global.workspace.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    // Layer 2: Workspace config (<workspace>/.vibecode.toml)
    let workspace = load_workspace_config(&workspace_path);

    // Layer 3: CLI args
    let cli_partial = cli_to_partial(cli);

    let config = cli_partial
        .with_fallback(workspace)
        .with_fallback(global)
        .finalize(default_log_dir());

    Ok(config)
}

/// Persist `model` as the default in the global config file, keeping any
/// other settings already present there.
pub fn save_global_model(model: &str) -> Result<PathBuf, ConfigError> {
    let path = global_config_path().ok_or(ConfigError::NoConfigDir)?;

    let mut file = match std::fs::read_to_string(&path) {
        Ok(contents) => toml::from_str::<ConfigFile>(&contents).map_err(|e| {
            ConfigError::ParseError {
                path: path.clone(),
                message: e.to_string(),
            }
        })?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigFile::default(),
        Err(e) => return Err(e.into()),
    };

    file.general.get_or_insert_with(GeneralConfig::default).model = Some(model.to_string());

    let rendered =
        toml::to_string_pretty(&file).map_err(|e| ConfigError::SerializeError(e.to_string()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, rendered)?;
    tracing::info!(model, path = %path.display(), "Saved default model");
    Ok(path)
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if file not found.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Load workspace config from <workspace>/.vibecode.toml.
fn load_workspace_config(workspace_path: &Path) -> PartialConfig {
    load_toml_file(&workspace_path.join(WORKSPACE_CONFIG_FILE)).unwrap_or_default()
}

/// Load and parse a TOML config file into a PartialConfig.
/// Returns None on file-not-found; parse errors are logged and skipped.
fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            match toml::from_str::<ConfigFile>(&contents)
                .context(format!("Failed to parse {}", path.display()))
            {
                Ok(config_file) => {
                    tracing::info!("Loaded config from {}", path.display());
                    Some(config_file.to_partial())
                }
                Err(e) => {
                    tracing::warn!("Config parse error: {:#}", e);
                    None
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/vibecode/vibecode.toml
/// macOS: ~/Library/Application Support/vibecode/vibecode.toml
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vibecode")
        .map(|dirs| dirs.config_dir().join("vibecode.toml"))
}

/// Default directory for session transcripts, e.g. ~/.local/share/vibecode/logs.
fn default_log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vibecode").map(|dirs| dirs.data_dir().join("logs"))
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    PartialConfig {
        model: cli.model.clone(),
        workspace: cli.workspace.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn workspace_file_overrides_explicit_config_file() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        std::fs::write(
            &global,
            "[general]\nmodel = \"global-model\"\n\n[scripts]\ninterpreter = \"ruby3\"\n",
        )
        .unwrap();

        let ws = tmp.path().join("project");
        std::fs::create_dir_all(&ws).unwrap();
        std::fs::write(
            ws.join(WORKSPACE_CONFIG_FILE),
            "[general]\nmodel = \"project-model\"\n\n[agent]\ntree_depth = 5\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "vibecode",
            "--config",
            global.to_str().unwrap(),
            "--workspace",
            ws.to_str().unwrap(),
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.model, "project-model");
        assert_eq!(config.interpreter, "ruby3");
        assert_eq!(config.tree_depth, 5);
        assert_eq!(config.workspace, ws);
    }

    #[test]
    fn cli_model_beats_every_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(WORKSPACE_CONFIG_FILE),
            "[general]\nmodel = \"project-model\"\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "vibecode",
            "--config",
            tmp.path().join("missing.toml").to_str().unwrap(),
            "--workspace",
            tmp.path().to_str().unwrap(),
            "--model",
            "cli-model",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.model, "cli-model");
    }

    #[test]
    fn invalid_toml_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.toml");
        std::fs::write(&bad, "[general\nmodel = ").unwrap();
        assert!(load_toml_file(&bad).is_none());
    }

    #[test]
    fn extension_leading_dot_is_stripped() {
        let file: ConfigFile = toml::from_str("[scripts]\nextension = \".py\"\n").unwrap();
        assert_eq!(file.to_partial().script_extension.as_deref(), Some("py"));
    }
}
