//! Global `tracing` subscriber setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

use crate::api::RequestLogging;
use crate::telemetry::OtelLayer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
    /// Paths whose request/response bodies are not logged.
    pub skip_body_paths: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let http = RequestLogging::default();
        Self {
            level: "info".to_owned(),
            format: LogFormat::default(),
            skip_body_paths: http.skip_body_paths,
            max_body_bytes: http.max_body_bytes,
        }
    }
}

impl LoggingConfig {
    #[must_use]
    pub fn request_logging(&self) -> RequestLogging {
        RequestLogging {
            skip_body_paths: self.skip_body_paths.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

/// `RUST_LOG` if set, otherwise `level`.
///
/// # Errors
/// Returns an error if `level` is not a valid filter directive.
pub fn env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| anyhow::anyhow!("invalid log level '{level}': {e}")),
    }
}

/// Install the global subscriber: filter, console output and the optional
/// OpenTelemetry layer. `log` records are bridged into `tracing`.
///
/// # Errors
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_logging(cfg: &LoggingConfig, otel: Option<OtelLayer>) -> anyhow::Result<()> {
    let filter = env_filter(&cfg.level)?;

    // JSON lines carry the current span's fields (request_id, trace_id)
    let console = match cfg.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
    };

    let subscriber = Registry::default().with(otel).with(console).with(filter);

    tracing_log::LogTracer::init().map_err(|e| anyhow::anyhow!("log bridge: {e}"))?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("tracing subscriber already installed: {e}"))?;
    Ok(())
}
