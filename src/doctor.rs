//! Environment checks behind `vibecode doctor`.

use std::path::Path;

use crate::agent::OllamaGateway;
use crate::config::AppConfig;
use crate::exec::run_captured;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

/// Run `program --version` and report the first line of its output.
pub async fn program_check(name: &str, program: &str, cwd: &Path) -> Check {
    let args = ["--version".to_string()];
    let (ok, detail) = match run_captured(program, &args, cwd, None).await {
        Ok(result) if result.succeeded() => {
            let first = result
                .stdout
                .lines()
                .chain(result.stderr.lines())
                .find(|l| !l.trim().is_empty())
                .unwrap_or("installed")
                .trim()
                .to_string();
            (true, first)
        }
        Ok(result) => (false, format!("`{program} --version` exited with {:?}", result.exit_status)),
        Err(e) => (false, e.to_string()),
    };
    Check {
        name: name.to_string(),
        ok,
        detail,
    }
}

pub async fn run_checks(config: &AppConfig, gateway: &OllamaGateway) -> Vec<Check> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| config.workspace.clone());

    let mut checks = vec![program_check("ollama", "ollama", &cwd).await];

    let alive = gateway.server_alive().await;
    checks.push(Check {
        name: "ollama server".to_string(),
        ok: alive,
        detail: if alive {
            "responding".to_string()
        } else {
            "not reachable; try `ollama serve`".to_string()
        },
    });

    checks.push(program_check("git", "git", &cwd).await);
    checks.push(program_check("interpreter", &config.interpreter, &cwd).await);
    checks
}
