/// Cadence CLI - interactive windowed playlist shell
use anyhow::Context;
use cadence_playlist::{MemoryEngine, PlayerEvent, PlaylistController, ResumeStateStore};
use cadence_storage::JsonResumeStore;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod config;
mod shell;

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::shell::Shell;

#[derive(Parser)]
#[command(name = "cadence-cli")]
#[command(about = "Drive a windowed playlist controller from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./cadence.toml when present)
    #[arg(short, long, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell (default)
    Shell,
    /// Print the saved resume state
    Show,
    /// Delete the saved resume state
    Forget,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => run_shell(&config),
        Commands::Show => show_state(&config),
        Commands::Forget => {
            JsonResumeStore::new(&config.resume_path).delete()?;
            println!("Removed {}", config.resume_path.display());
            Ok(())
        }
    }
}

fn run_shell(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_file(path)?,
        None => Catalog::demo(),
    };
    tracing::info!(tracks = catalog.tracks().len(), "Catalog ready");

    let store = JsonResumeStore::new(&config.resume_path);
    let saved = store.load().context("Failed to load resume state")?;

    let engine = MemoryEngine::new();
    let controller = PlaylistController::spawn(
        config.controller.clone(),
        Box::new(store),
        |callbacks| engine.attach(callbacks),
    )
    .context("Failed to start playlist controller")?;

    controller.add_listener(Arc::new(|event: &PlayerEvent| {
        if let Some(line) = shell::describe_event(event) {
            println!("  [{}]", line);
        }
    }));

    match saved {
        Some(state) => {
            tracing::info!(
                items = state.track_ids.len(),
                position_ms = state.position_ms,
                "Restoring saved playlist"
            );
            controller.restore(&state, &catalog)?;
        }
        None => tracing::info!("No saved playlist, use 'load' to queue the catalog"),
    }

    let shell = Shell::new(controller.handle(), engine, catalog);
    shell.run(io::stdin().lock(), io::stdout().lock())?;

    controller.shutdown();
    tracing::info!("Goodbye");
    Ok(())
}

fn show_state(config: &AppConfig) -> anyhow::Result<()> {
    let store = JsonResumeStore::new(&config.resume_path);
    match store.read()? {
        Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        None => println!("No resume state at {}", config.resume_path.display()),
    }
    Ok(())
}
