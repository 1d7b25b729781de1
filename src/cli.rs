use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vibecode", version, about = "Terminal coding agent backed by a local Ollama model")]
pub struct Cli {
    /// Ollama model name (e.g., "qwen3-coder:latest", "llama3.2")
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Project directory the agent may read and modify
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Path to config file (overrides default search)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive agent session (default)
    Chat,
    /// List models installed in Ollama
    Models,
    /// Make a model the default, pulling it first if needed
    Use {
        /// Model name to activate
        model: String,
    },
    /// Download a model into Ollama
    Pull {
        /// Model name to pull
        model: String,
    },
    /// Check that Ollama, git and the script interpreter are available
    Doctor,
}

impl Cli {
    /// The subcommand to run; a bare `vibecode` starts a chat session.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_defaults_to_chat() {
        let cli = Cli::parse_from(["vibecode"]);
        assert_eq!(cli.command(), Commands::Chat);
        assert!(cli.model.is_none());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["vibecode", "doctor", "--model", "llama3.2", "-w", "/tmp/proj"]);
        assert_eq!(cli.command(), Commands::Doctor);
        assert_eq!(cli.model.as_deref(), Some("llama3.2"));
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/proj")));
    }

    #[test]
    fn use_takes_model_argument() {
        let cli = Cli::parse_from(["vibecode", "use", "qwen2.5:7b"]);
        assert_eq!(
            cli.command(),
            Commands::Use {
                model: "qwen2.5:7b".to_string()
            }
        );
    }
}
