//! Loadstone - content package loading and validation pipeline
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use loadstone::cli::{Cli, Commands};
use loadstone::config::{Config, ConfigManager};
use loadstone::error::LoadstoneResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> LoadstoneResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("loadstone=warn"),
        1 => EnvFilter::new("loadstone=info"),
        _ => EnvFilter::new("loadstone=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    let mut config = config_manager.load().await?;
    apply_overrides(&mut config, &cli);

    // Dispatch to command
    match cli.command {
        Commands::Validate(args) => loadstone::cli::commands::validate(args, &config).await,
        Commands::Fetch(args) => loadstone::cli::commands::fetch(args, &config).await,
        Commands::Cache(args) => loadstone::cli::commands::cache(args, &config).await,
    }
}

/// Apply command-line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ref dir) = cli.cache_dir {
        config.cache.root = Some(dir.clone());
    }
    if let Some(ref dir) = cli.source_dir {
        config.source.dir = Some(dir.clone());
        config.source.url = None;
    }
    if let Some(ref url) = cli.source_url {
        config.source.url = Some(url.clone());
        config.source.dir = None;
    }
    if let Some(ref dir) = cli.base_content {
        config.runtime.base_content = Some(dir.clone());
    }
}
