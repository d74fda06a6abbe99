//! toolrelay: interactive tool-calling chat for text-only completion backends

mod repl;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use toolrelay_core::config::ConfigFile;
use toolrelay_core::{
    create_backend, CancellationToken, CompletionBackend, Conversation, EnvSecretStore,
    FileConfigProvider, Logger, SecretStore, ToolRegistry, TracingLogger, TurnOrchestrator,
};

use repl::{next_backend, ReplCommand, HELP};

/// Chat with a completion backend that calls MCP tools through sentinel-encoded text
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (default: .config/toolrelay/config.yaml, then the user config)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend to start with (default: the first configured backend)
    #[arg(long)]
    backend: Option<String>,

    /// Maximum backend requests per turn
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Write the effective config to its file (keeping a backup) and exit
    #[arg(long)]
    write_config: bool,
}

fn init_tracing() {
    // stdout is reserved for answers
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn build_backend(
    config: &ConfigFile,
    name: &str,
    secrets: &dyn SecretStore,
    logger: Arc<dyn Logger>,
) -> Result<Arc<dyn CompletionBackend>> {
    let backend_config = config.backend(name)?;
    let backend = create_backend(backend_config, secrets, config.system_prompt.as_deref(), logger)?;
    Ok(backend)
}

fn prompt(backend: &str) -> Result<()> {
    print!("[{}] > ", backend);
    std::io::stdout().flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
    let secrets: Arc<dyn SecretStore> = Arc::new(EnvSecretStore::new());

    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let provider = FileConfigProvider::discover(cli.config.clone(), &cwd);
    let mut config = provider
        .config()
        .with_context(|| format!("failed to load {}", provider.path().display()))?;
    tracing::info!(
        "Using {} config {}",
        provider.level().as_str(),
        provider.path().display()
    );

    if let Some(max) = cli.max_iterations {
        config.turn.max_iterations = max;
    }

    if cli.write_config {
        if let Some(backup) = provider.backup()? {
            println!("Previous config saved to {}", backup.display());
        }
        provider.save(&config)?;
        println!("Wrote {}", provider.path().display());
        return Ok(());
    }

    let backend_names: Vec<String> = config.backends.iter().map(|b| b.name.clone()).collect();
    let initial = cli
        .backend
        .clone()
        .or_else(|| backend_names.first().cloned())
        .context("no backends configured")?;
    let backend = build_backend(&config, &initial, secrets.as_ref(), logger.clone())?;

    let registry = Arc::new(
        ToolRegistry::new(logger.clone()).with_timeout(std::time::Duration::from_secs(
            config.turn.tool_timeout_secs,
        )),
    );
    let summary = registry.connect_all(&config.servers, secrets.clone()).await;
    for (name, reason) in &summary.failed {
        eprintln!("warning: tool server '{}' unavailable: {}", name, reason);
    }
    println!(
        "{} tools from {} servers. Type 'help' for commands.",
        registry.tool_count(),
        summary.connected.len()
    );

    let mut orchestrator =
        TurnOrchestrator::new(backend, registry.clone(), config.turn.clone(), logger.clone());
    let mut conversation = Conversation::new();

    let result = run_loop(
        &config,
        &backend_names,
        secrets.as_ref(),
        logger,
        &mut orchestrator,
        &mut conversation,
    )
    .await;

    registry.shutdown().await;
    result
}

async fn run_loop(
    config: &ConfigFile,
    backend_names: &[String],
    secrets: &dyn SecretStore,
    logger: Arc<dyn Logger>,
    orchestrator: &mut TurnOrchestrator,
    conversation: &mut Conversation,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt(orchestrator.backend_name())?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            return Ok(());
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => return Ok(()),
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Clear => {
                conversation.clear();
                println!("Conversation cleared.");
            }
            ReplCommand::Tools => {
                let names = orchestrator.registry().tool_names();
                if names.is_empty() {
                    println!("No tools available.");
                }
                for name in names {
                    println!("  {}", name);
                }
            }
            ReplCommand::Switch(target) => {
                let target = match target {
                    Some(name) => name,
                    None => match next_backend(backend_names, orchestrator.backend_name()) {
                        Some(name) => name.to_string(),
                        None => {
                            println!("No backends configured.");
                            continue;
                        }
                    },
                };
                match build_backend(config, &target, secrets, logger.clone()) {
                    Ok(backend) => {
                        orchestrator.set_backend(backend);
                        println!("Switched to {}.", orchestrator.backend_name());
                    }
                    Err(e) => println!("Cannot switch to {}: {:#}", target, e),
                }
            }
            ReplCommand::Query(query) => {
                let cancel = CancellationToken::new();
                let watcher = {
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            cancel.cancel();
                        }
                    })
                };

                let outcome = orchestrator.run_turn(conversation, &query, &cancel).await;
                watcher.abort();

                if !outcome.tool_calls.is_empty() {
                    tracing::debug!("Turn used {} tool calls", outcome.tool_calls.len());
                }
                println!("{}", outcome.answer);
            }
        }
    }
}
