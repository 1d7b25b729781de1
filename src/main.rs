use std::io::Write;

use clap::Parser;

use vibecode::agent::{repl, Orchestrator, OllamaGateway};
use vibecode::cli::{Cli, Commands};
use vibecode::config::{self, AppConfig};
use vibecode::doctor;
use vibecode::ui::{style, ConsoleOperator};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with the conversation on stdout.
    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    let config = config::load_config(&cli)?;
    tracing::debug!(model = %config.model, workspace = %config.workspace.display(), "Config loaded");

    let gateway = OllamaGateway::default();

    match cli.command() {
        Commands::Chat => chat(config, gateway).await,
        Commands::Models => list_models(&config, &gateway).await,
        Commands::Use { model } => use_model(&gateway, &model).await,
        Commands::Pull { model } => pull(&gateway, &model).await,
        Commands::Doctor => {
            for check in doctor::run_checks(&config, &gateway).await {
                let mark = if check.ok {
                    style::success("ok")
                } else {
                    style::error("missing")
                };
                println!("{:<14} {mark}  {}", check.name, style::dim(&check.detail));
            }
            Ok(())
        }
    }
}

async fn chat(config: AppConfig, gateway: OllamaGateway) -> anyhow::Result<()> {
    if !gateway.server_alive().await {
        eprintln!(
            "{}",
            style::yellow("Ollama does not seem to be running. Start it with `ollama serve`.")
        );
    }

    println!("{}", style::header("Vibecode"));
    println!("  Model: {}", config.model);
    println!("  Workspace: {}", config.workspace.display());

    let mut orchestrator = Orchestrator::new(config, gateway, ConsoleOperator)?;
    if let Some(path) = orchestrator.session_log_path() {
        println!("  Log: {}", style::dim(path.display()));
    }
    println!("{}", style::dim("Type `exit` or `quit` to leave."));

    repl::run(&mut orchestrator, std::io::stdin().lock()).await?;
    Ok(())
}

async fn list_models(config: &AppConfig, gateway: &OllamaGateway) -> anyhow::Result<()> {
    let models = gateway.list_models().await?;
    if models.is_empty() {
        println!("No models installed. Try `vibecode pull {}`.", config.model);
        return Ok(());
    }
    for model in models {
        if model == config.model {
            println!("{} {}", style::accent("*"), style::success(&model));
        } else {
            println!("  {model}");
        }
    }
    Ok(())
}

async fn use_model(gateway: &OllamaGateway, model: &str) -> anyhow::Result<()> {
    if !gateway.model_installed(model).await {
        println!("{model} is not installed; pulling it first.");
        pull(gateway, model).await?;
    }
    let path = config::save_global_model(model)?;
    println!(
        "{}",
        style::success(format!("Now using {model} (saved to {})", path.display()))
    );
    Ok(())
}

async fn pull(gateway: &OllamaGateway, model: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    gateway
        .pull_model(model, |progress| {
            let _ = write!(stdout, "\r{:<60}", progress.describe());
            let _ = stdout.flush();
        })
        .await?;
    println!("\n{}", style::success(format!("Pulled {model}")));
    Ok(())
}
