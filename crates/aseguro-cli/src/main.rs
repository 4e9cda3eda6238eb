//! Aseguro CLI
//!
//! Ask questions about insurance policies and compare insurers.

use anyhow::Result;
use aseguro_core::{AseguroError, Config};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<AseguroError>()
            .map(AseguroError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

/// `RUST_LOG` when set and valid, otherwise warn (debug with `--verbose`)
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return filter,
            Err(e) => eprintln!("Ignoring invalid RUST_LOG '{}': {}", directives, e),
        }
    }
    EnvFilter::new(if verbose { "debug" } else { "warn" })
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Ctrl+C cancels the in-flight query
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received interrupt, cancelling");
            signal_token.cancel();
        }
    });

    match cli.command {
        Commands::Ask(args) => commands::ask::run(args, &config, cli.format, &cancel).await,
        Commands::Chat => commands::chat::run(&config, cli.format, &cancel).await,
        Commands::Compare(args) => {
            commands::compare::run(args, &config, cli.format, &cancel).await
        }
        Commands::Ingest(args) => commands::ingest::run(args, &config, &cancel).await,
        Commands::Classify(args) => {
            commands::classify::run(args, &config, cli.format, &cancel).await
        }
        Commands::Cache(args) => commands::cache::run(args, &config, &cancel).await,
        Commands::Status => commands::status::run(&config, cli.format).await,
    }
}
