// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadence Daemon (cadenced)
//!
//! Runs the recurring-task scheduler until signalled, and offers offline
//! commands to check and preview a configuration.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod lifecycle;
mod preview;

use std::path::PathBuf;

use anyhow::Result;
use cadence_core::{Clock, SystemClock, Timestamp};
use clap::{Args, Parser, Subcommand};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::config::{DaemonConfig, LoggingConfig};
use crate::lifecycle::DaemonError;

#[derive(Parser)]
#[command(
    name = "cadenced",
    version,
    about = "Cadence - recurring task scheduler daemon"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler until SIGINT or SIGTERM
    Run(RunArgs),
    /// Print the occurrences each configured template would generate
    Preview(PreviewArgs),
    /// Validate a configuration file
    Check(CheckArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file (defaults to the user config dir, if present)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct PreviewArgs {
    #[arg(long, short)]
    config: PathBuf,
    /// Start of the preview window in epoch milliseconds (defaults to now)
    #[arg(long)]
    from: Option<Timestamp>,
    /// Maximum occurrences per template
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct CheckArgs {
    #[arg(long, short)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Preview(args) => print_preview(args),
        Commands::Check(args) => check(args),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = DaemonConfig::load_or_default(args.config.as_deref())?;
    config.validate()?;

    let _log_guard = setup_logging(&config.logging)?;
    info!("Starting cadenced");

    let daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to start scheduler: {}", e);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Signal ready for a parent process waiting on startup
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    daemon.shutdown().await?;
    info!("Daemon stopped");
    Ok(())
}

fn print_preview(args: PreviewArgs) -> Result<()> {
    let config = DaemonConfig::load(&args.config)?;
    config.validate()?;

    let from = args.from.unwrap_or_else(|| SystemClock.now());
    for line in preview::preview(&config, from, args.limit)? {
        println!("{line}");
    }
    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let config = DaemonConfig::load(&args.config)?;
    config.validate()?;
    println!("ok: {} template(s)", config.templates.len());
    Ok(())
}

/// Install the global subscriber; returns the guard when logging to a file
fn setup_logging(
    logging: &LoggingConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, DaemonError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let Some(path) = &logging.file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .ok_or_else(|| DaemonError::InvalidLogPath(path.clone()))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| DaemonError::InvalidLogPath(path.clone()))?;
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir)?;
    }

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
