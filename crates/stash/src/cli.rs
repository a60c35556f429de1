//! Command line interface
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stash serve` | Run the monitor until Ctrl-C, then shut down gracefully |
//! | `stash health` | Run every health check and print the result as JSON |
//! | `stash report` | Collect one metrics snapshot and print the report as JSON |
//! | `stash backends` | List the available backends |
//!
//! One-shot commands do not install a log subscriber so their stdout
//! stays machine-readable.

use anyhow::Context;
use clap::{Parser, Subcommand};
use stash_infrastructure::config::{AppConfig, ConfigLoader};
use stash_infrastructure::health::HealthStatus;
use stash_infrastructure::logging::init_logging;
use stash_infrastructure::init_cache;
use std::path::PathBuf;
use tracing::{info, warn};

/// Command line interface for Stash
#[derive(Parser, Debug)]
#[command(name = "stash")]
#[command(about = "Stash - pluggable caching with invalidation, refresh and monitoring")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the cache services until interrupted
    Serve,
    /// Print the health of every backend and the host
    Health,
    /// Print a metrics report
    Report,
    /// List the available backends
    Backends,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::new().with_config_path(path),
        None => ConfigLoader::new(),
    };
    loader.load().context("Failed to load configuration")
}

/// Execute a parsed command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Backends => {
            for (kind, description) in stash_providers::list_backends() {
                println!("{:<8} {description}", kind.as_str());
            }
            Ok(())
        }
        Command::Health => {
            let context = init_cache(load_config(cli.config.as_ref())?).await?;
            let response = context.health().perform_health_checks().await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response.status == HealthStatus::Down {
                anyhow::bail!("cache is down");
            }
            Ok(())
        }
        Command::Report => {
            let context = init_cache(load_config(cli.config.as_ref())?).await?;
            context.monitor().run_cycle().await;
            let report = context.monitor().export_metrics().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Serve => serve(load_config(cli.config.as_ref())?).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    init_logging(&config.logging)?;
    let context = init_cache(config).await?;
    context.start().await?;
    info!("stash running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    if !context.shutdown().await {
        warn!("some background tasks did not stop in time");
    }
    Ok(())
}
