//! `GET /health`: database reachability and process memory, with a
//! redacted view of the effective configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{Map, Value, json};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use url::Url;

use crate::config::AppConfig;

/// Ordered from best to worst; a report takes the worst of its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthEntry {
    pub status: HealthStatus,
    pub description: Option<String>,
    pub data: Map<String, Value>,
}

impl HealthEntry {
    fn new(status: HealthStatus, description: impl Into<String>) -> Self {
        Self {
            status,
            description: Some(description.into()),
            data: Map::new(),
        }
    }
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check(&self) -> HealthEntry;
}

pub struct DatabaseCheck {
    db: DatabaseConnection,
}

impl DatabaseCheck {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HealthCheck for DatabaseCheck {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn check(&self) -> HealthEntry {
        match self.db.ping().await {
            Ok(()) => HealthEntry::new(HealthStatus::Healthy, "Database is reachable"),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                HealthEntry::new(HealthStatus::Unhealthy, e.to_string())
            }
        }
    }
}

pub struct MemoryCheck {
    threshold_bytes: u64,
    system: Mutex<System>,
}

impl MemoryCheck {
    #[must_use]
    pub fn new(threshold_bytes: u64) -> Self {
        Self {
            threshold_bytes,
            system: Mutex::new(System::new()),
        }
    }

    fn resident_bytes(&self) -> Option<u64> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut sys = self.system.lock();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        sys.process(pid).map(sysinfo::Process::memory)
    }

    /// Degraded once `allocated` reaches the threshold.
    #[must_use]
    pub fn evaluate(allocated: u64, threshold: u64) -> HealthEntry {
        let status = if allocated >= threshold {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        let mut entry = HealthEntry::new(
            status,
            format!("Reports degraded status if allocated bytes >= {threshold} bytes."),
        );
        entry.data.insert("allocatedBytes".to_owned(), json!(allocated));
        entry.data.insert("thresholdBytes".to_owned(), json!(threshold));
        entry
    }
}

#[async_trait]
impl HealthCheck for MemoryCheck {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn check(&self) -> HealthEntry {
        match self.resident_bytes() {
            Some(bytes) => Self::evaluate(bytes, self.threshold_bytes),
            None => HealthEntry::new(HealthStatus::Degraded, "Process memory is unavailable"),
        }
    }
}

/// Replace the DSN password with its first and last characters around `***`.
#[must_use]
pub fn mask_dsn(dsn: &str) -> String {
    let Ok(mut url) = Url::parse(dsn) else {
        return dsn.to_owned();
    };
    let Some(masked) = url.password().map(mask_secret) else {
        return dsn.to_owned();
    };
    if url.set_password(Some(&masked)).is_err() {
        return dsn.to_owned();
    }
    url.to_string()
}

fn mask_secret(secret: &str) -> String {
    let mut chars = secret.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => format!("{first}***{last}"),
        (Some(only), None) => format!("{only}***{only}"),
        _ => "***".to_owned(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationInfo {
    pub connection_string: String,
    pub default_log_level: String,
    pub host_environment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub configuration: ConfigurationInfo,
    pub results: BTreeMap<&'static str, HealthEntry>,
}

pub struct HealthState {
    configuration: ConfigurationInfo,
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthState {
    #[must_use]
    pub fn new(config: &AppConfig, checks: Vec<Arc<dyn HealthCheck>>) -> Self {
        Self {
            configuration: ConfigurationInfo {
                connection_string: mask_dsn(&config.database.dsn),
                default_log_level: config.logging.level.clone(),
                host_environment: config.server.environment.as_str().to_owned(),
            },
            checks,
        }
    }

    pub async fn report(&self) -> HealthReport {
        let mut results = BTreeMap::new();
        for check in &self.checks {
            results.insert(check.name(), check.check().await);
        }
        let status = results
            .values()
            .map(|e| e.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        HealthReport {
            status,
            configuration: self.configuration.clone(),
            results,
        }
    }
}

async fn health(State(state): State<Arc<HealthState>>) -> Response {
    let report = state.report().await;
    let status = if report.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    match serde_json::to_vec_pretty(&report) {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render health report");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[must_use]
pub fn router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}
