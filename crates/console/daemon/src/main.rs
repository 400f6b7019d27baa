//! Console daemon - approval workflows and project package staging
//!
//! The daemon provides:
//! - REST API for workflow definitions and task approval actions
//! - The project package handoff (submit, accept, activate, send-back)
//! - Minimal directory endpoints for users, projects and tasks

use anyhow::Context;
use clap::Parser;
use console_daemon::config::{ConsoleConfig, StorageConfig};
use console_daemon::Server;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Console daemon CLI
#[derive(Parser)]
#[command(name = "consoled")]
#[command(about = "Delivery Console approval daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONSOLE_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "CONSOLE_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level
    #[arg(long, env = "CONSOLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "CONSOLE_LOG_JSON")]
    json: bool,

    /// Snapshot the store to this file instead of keeping it in memory only
    #[arg(long, env = "CONSOLE_STORAGE_PATH")]
    storage_path: Option<PathBuf>,

    /// JSON fixture with users, projects, tasks and definitions
    #[arg(long, env = "CONSOLE_SEED")]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config =
        ConsoleConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .with_context(|| format!("invalid listen address: {}", listen))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    if let Some(path) = cli.storage_path {
        config.storage = StorageConfig::File { path };
    }
    if let Some(seed) = cli.seed {
        config.seed_path = Some(seed);
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        "Starting console daemon"
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await?;
    Ok(())
}
