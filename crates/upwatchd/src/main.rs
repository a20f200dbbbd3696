//! upwatchd — the upwatch daemon.
//!
//! Assembles the status subsystems into one process:
//! - Manual-test side store (redb)
//! - HTTP upstream source
//! - Status engine + periodic refresh loop
//! - REST API
//!
//! # Usage
//!
//! ```text
//! upwatchd run --config /etc/upwatch/upwatch.toml --port 8480
//! upwatchd status --config /etc/upwatch/upwatch.toml --json
//! ```

mod daemon;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use upwatch_core::UpwatchConfig;
use upwatch_core::config::parse_nonzero;

#[derive(Parser)]
#[command(name = "upwatchd", about = "upwatch endpoint status daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the API and refresh statuses periodically.
    Run {
        /// Path to upwatch.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for the manual-test store.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Refresh interval (e.g., "30s", "2m").
        #[arg(long)]
        refresh_interval: Option<String>,
    },

    /// Run one refresh and print the resolved statuses.
    Status {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML.
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,upwatchd=debug,upwatch=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            port,
            data_dir,
            refresh_interval,
        } => {
            let mut config = load_config(config.as_deref())?;
            apply_overrides(&mut config, port, data_dir, refresh_interval)?;
            daemon::run(config).await
        }
        Command::Status { config, json } => {
            let config = load_config(config.as_deref())?;
            daemon::print_status(config, json).await
        }
        Command::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<UpwatchConfig> {
    match path {
        Some(path) => UpwatchConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(UpwatchConfig::default()),
    }
}

/// Command-line flags win over file values.
fn apply_overrides(
    config: &mut UpwatchConfig,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    refresh_interval: Option<String>,
) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.daemon.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.daemon.data_dir = data_dir;
    }
    if let Some(interval) = refresh_interval {
        if parse_nonzero(&interval).is_none() {
            anyhow::bail!("invalid refresh interval: {interval} (must be a positive duration)");
        }
        config.daemon.refresh_interval = interval;
    }
    Ok(())
}
