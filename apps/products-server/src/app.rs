//! Router assembly and database setup.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use products::{ProductService, SeaOrmProductsRepository, resources::default_resources};
use products_sdk::ProductsApi;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use svckit::api::{ErrorTranslator, apply_middleware_stack};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, DatabaseConfig};
use crate::health::{self, DatabaseCheck, HealthCheck, HealthState, MemoryCheck};

/// # Errors
/// Returns an error if the database cannot be reached.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(cfg.dsn.clone());
    opts.max_connections(cfg.max_connections).sqlx_logging(false);

    Database::connect(opts)
        .await
        .with_context(|| format!("connecting to {}", health::mask_dsn(&cfg.dsn)))
}

/// Cancel `service` once `shutdown` has fired and `grace` has elapsed.
///
/// Requests still running when the grace period ends answer 499 instead of
/// holding the process open.
pub fn cancel_after_grace(
    shutdown: CancellationToken,
    service: CancellationToken,
    grace: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        shutdown.cancelled().await;
        tokio::select! {
            () = service.cancelled() => {}
            () = tokio::time::sleep(grace) => {
                tracing::warn!(
                    grace_ms = grace.as_millis(),
                    "Shutdown grace elapsed, cancelling in-flight calls"
                );
                service.cancel();
            }
        }
    })
}

/// Products and health routes behind the full middleware stack.
///
/// `cancel` aborts in-flight service calls. Keep it separate from the
/// listener's shutdown token so a shutdown signal lets running requests
/// finish (see [`cancel_after_grace`]).
///
/// # Errors
/// Returns an error if the built-in message catalog is malformed.
pub fn build_router(
    config: &AppConfig,
    db: DatabaseConnection,
    cancel: CancellationToken,
) -> anyhow::Result<Router> {
    let resources = default_resources()
        .context("loading message catalog")?
        .with_overrides(config.resources.clone());
    let translator =
        ErrorTranslator::new(Arc::new(resources)).with_diagnostics(config.diagnostics_enabled());

    let repo = SeaOrmProductsRepository::new(db.clone());
    let service: Arc<dyn ProductsApi> = Arc::new(ProductService::new(
        Arc::new(repo),
        config.products.clone(),
        cancel,
    ));

    let checks: Vec<Arc<dyn HealthCheck>> = vec![
        Arc::new(DatabaseCheck::new(db)),
        Arc::new(MemoryCheck::new(config.health.memory_threshold_bytes)),
    ];
    let health_state = Arc::new(HealthState::new(config, checks));

    let routes = products::api::rest::router(service).merge(health::router(health_state));

    Ok(apply_middleware_stack(
        routes,
        Arc::new(translator),
        Arc::new(config.logging.request_logging()),
    ))
}
