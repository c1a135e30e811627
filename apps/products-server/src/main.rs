#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use products::Migrator;
use sea_orm_migration::MigratorTrait;
use svckit::bootstrap::{cancel_on_signal, init_logging};
use svckit::telemetry::{init_tracing, shutdown_tracing};
use tokio_util::sync::CancellationToken;

mod app;
mod config;
mod health;

use config::{AppConfig, CliOverrides, Environment};

/// Products Server - products REST service
#[derive(Parser)]
#[command(name = "products-server")]
#[command(about = "Products Server - products REST service")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Hosting environment override (overrides config)
    #[arg(short, long, value_enum)]
    environment: Option<Environment>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (PRODUCTS__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(CliOverrides {
        port: cli.port,
        environment: cli.environment,
        verbose: cli.verbose,
    });

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    // Build OpenTelemetry layer before logging
    let (otel_layer, tracing_guard) = match init_tracing(&config.tracing)? {
        Some((layer, guard)) => (Some(layer), Some(guard)),
        None => (None, None),
    };
    init_logging(&config.logging, otel_layer)?;

    tracing::info!(
        environment = config.server.environment.as_str(),
        "Products Server starting"
    );

    // Dispatch subcommands (default: run)
    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
        Commands::Migrate => migrate(&config).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = ?e, "Products Server failed");
    }
    if let Some(guard) = tracing_guard {
        shutdown_tracing(guard);
    }
    result
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn migrate(config: &AppConfig) -> Result<()> {
    let db = app::connect(&config.database).await?;
    Migrator::up(&db, None)
        .await
        .context("applying database migrations")?;
    tracing::info!("Database migrations applied");
    db.close().await?;
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    let db = app::connect(&config.database).await?;
    Migrator::up(&db, None)
        .await
        .context("applying database migrations")?;

    // The listener stops on `shutdown`; service calls keep running until the
    // grace period after it has elapsed.
    let shutdown = CancellationToken::new();
    let service_cancel = CancellationToken::new();
    let signals = cancel_on_signal(shutdown.clone());
    let drain = app::cancel_after_grace(
        shutdown.clone(),
        service_cancel.clone(),
        config.server.shutdown_grace(),
    );

    let router = app::build_router(&config, db.clone(), service_cancel.clone())?;
    let addr = config.server.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("serving HTTP");

    service_cancel.cancel();
    drain.abort();
    signals.abort();
    served?;
    db.close().await?;
    tracing::info!("Products Server stopped");
    Ok(())
}
