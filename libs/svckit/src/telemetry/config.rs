//! OpenTelemetry tracing configuration types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tracing configuration for OpenTelemetry distributed tracing
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub service_name: Option<String>,
    pub exporter: Option<Exporter>,
    pub sampler: Option<Sampler>,
    pub resource: Option<HashMap<String, String>>,
}

impl TracingConfig {
    pub const DEFAULT_SERVICE_NAME: &'static str = "products-service";

    #[must_use]
    pub fn service_name(&self) -> &str {
        self.service_name
            .as_deref()
            .unwrap_or(Self::DEFAULT_SERVICE_NAME)
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq, Eq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ExporterKind {
    #[default]
    OtlpGrpc,
    OtlpHttp,
}

impl ExporterKind {
    #[must_use]
    pub const fn default_endpoint(self) -> &'static str {
        match self {
            Self::OtlpGrpc => "http://127.0.0.1:4317",
            Self::OtlpHttp => "http://127.0.0.1:4318",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct Exporter {
    #[serde(default)]
    pub kind: ExporterKind,
    pub endpoint: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Sampler {
    ParentBasedAlwaysOn,
    ParentBasedRatio {
        #[serde(skip_serializing_if = "Option::is_none")]
        ratio: Option<f64>,
    },
    AlwaysOn,
    AlwaysOff,
}
