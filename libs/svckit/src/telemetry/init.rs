//! OpenTelemetry tracing initialization utilities
//!
//! Sets up the W3C propagator and an OTLP (gRPC or HTTP) span exporter for
//! collectors such as Jaeger or the OTel Collector.

#[cfg(feature = "otel")]
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};

#[cfg(feature = "otel")]
use opentelemetry_otlp::{Protocol, WithExportConfig};
// Extension traits for builder methods like `.with_headers()` and `.with_metadata()`.
#[cfg(feature = "otel")]
use opentelemetry_otlp::{WithHttpConfig, WithTonicConfig};

#[cfg(feature = "otel")]
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    trace::{Sampler as SdkSampler, SdkTracerProvider},
};

#[cfg(feature = "otel")]
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};

#[cfg(feature = "otel")]
use super::config::{ExporterKind, Sampler};
use super::config::TracingConfig;

/// Layer type attached to the subscriber registry.
#[cfg(feature = "otel")]
pub type OtelLayer = tracing_opentelemetry::OpenTelemetryLayer<
    tracing_subscriber::Registry,
    opentelemetry_sdk::trace::Tracer,
>;

#[cfg(not(feature = "otel"))]
pub type OtelLayer = tracing_subscriber::layer::Identity;

/// Keeps the tracer provider alive; pass it to [`shutdown_tracing`] on exit.
#[must_use]
pub struct TracingGuard {
    #[cfg(feature = "otel")]
    provider: SdkTracerProvider,
}

impl std::fmt::Debug for TracingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingGuard").finish_non_exhaustive()
    }
}

// ===== init_tracing (feature = "otel") ========================================

/// Build resource with service name and custom attributes
#[cfg(feature = "otel")]
fn build_resource(cfg: &TracingConfig) -> Resource {
    let mut attrs = vec![KeyValue::new("service.name", cfg.service_name().to_owned())];

    if let Some(resource_map) = &cfg.resource {
        for (k, v) in resource_map {
            attrs.push(KeyValue::new(k.clone(), v.clone()));
        }
    }

    Resource::builder_empty().with_attributes(attrs).build()
}

/// Build sampler from configuration
#[cfg(feature = "otel")]
fn build_sampler(cfg: &TracingConfig) -> SdkSampler {
    match cfg.sampler {
        Some(Sampler::AlwaysOff) => SdkSampler::AlwaysOff,
        Some(Sampler::AlwaysOn) => SdkSampler::AlwaysOn,
        Some(Sampler::ParentBasedRatio { ratio }) => SdkSampler::ParentBased(Box::new(
            SdkSampler::TraceIdRatioBased(ratio.unwrap_or(0.1)),
        )),
        Some(Sampler::ParentBasedAlwaysOn) | None => {
            SdkSampler::ParentBased(Box::new(SdkSampler::AlwaysOn))
        }
    }
}

/// Extract exporter kind, endpoint and timeout from configuration
#[cfg(feature = "otel")]
fn extract_exporter_config(
    cfg: &TracingConfig,
) -> (ExporterKind, String, Option<std::time::Duration>) {
    let kind = cfg.exporter.as_ref().map(|e| e.kind).unwrap_or_default();
    let endpoint = cfg
        .exporter
        .as_ref()
        .and_then(|e| e.endpoint.clone())
        .unwrap_or_else(|| kind.default_endpoint().to_owned());
    let timeout = cfg
        .exporter
        .as_ref()
        .and_then(|e| e.timeout_ms)
        .map(std::time::Duration::from_millis);

    (kind, endpoint, timeout)
}

#[cfg(feature = "otel")]
fn build_exporter(cfg: &TracingConfig) -> anyhow::Result<opentelemetry_otlp::SpanExporter> {
    let (kind, endpoint, timeout) = extract_exporter_config(cfg);
    tracing::info!(?kind, %endpoint, "OTLP exporter config");

    let exporter = match kind {
        ExporterKind::OtlpHttp => {
            let mut b = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(endpoint);
            if let Some(t) = timeout {
                b = b.with_timeout(t);
            }
            if let Some(hmap) = build_headers_from_cfg_and_env(cfg) {
                b = b.with_headers(hmap);
            }
            b.build()
                .map_err(|e| anyhow::anyhow!("otlp http exporter build failed: {e}"))?
        }
        ExporterKind::OtlpGrpc => {
            let mut b = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint);
            if let Some(t) = timeout {
                b = b.with_timeout(t);
            }
            if let Some(md) = build_metadata_from_cfg_and_env(cfg) {
                b = b.with_metadata(md);
            }
            b.build()
                .map_err(|e| anyhow::anyhow!("otlp grpc exporter build failed: {e}"))?
        }
    };
    Ok(exporter)
}

/// Initialize OpenTelemetry tracing from configuration.
///
/// Returns `None` when tracing is disabled; otherwise the layer to attach to
/// `tracing_subscriber` and the guard used to flush spans on shutdown.
///
/// # Errors
/// Returns an error if the OTLP exporter cannot be built.
#[cfg(feature = "otel")]
pub fn init_tracing(cfg: &TracingConfig) -> anyhow::Result<Option<(OtelLayer, TracingGuard)>> {
    if !cfg.enabled {
        return Ok(None);
    }

    // W3C trace-context propagation for inbound/outbound headers
    global::set_text_map_propagator(TraceContextPropagator::new());

    let service_name = cfg.service_name();
    tracing::info!(service_name, "Building OpenTelemetry layer");

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(build_exporter(cfg)?)
        .with_sampler(build_sampler(cfg))
        .with_resource(build_resource(cfg))
        .build();

    global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer(service_name.to_owned());
    let otel_layer = tracing_opentelemetry::OpenTelemetryLayer::new(tracer);

    tracing::info!("OpenTelemetry layer created successfully");
    Ok(Some((otel_layer, TracingGuard { provider })))
}

#[cfg(feature = "otel")]
fn headers_from_env() -> Vec<(String, String)> {
    // OTEL_EXPORTER_OTLP_HEADERS (format: k=v,k2=v2)
    std::env::var("OTEL_EXPORTER_OTLP_HEADERS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|part| part.split_once('='))
                .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(feature = "otel")]
fn configured_headers(cfg: &TracingConfig) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = cfg
        .exporter
        .as_ref()
        .and_then(|e| e.headers.as_ref())
        .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    out.extend(headers_from_env());
    out
}

#[cfg(feature = "otel")]
fn build_headers_from_cfg_and_env(
    cfg: &TracingConfig,
) -> Option<std::collections::HashMap<String, String>> {
    let out: std::collections::HashMap<String, String> =
        configured_headers(cfg).into_iter().collect();
    if out.is_empty() { None } else { Some(out) }
}

#[cfg(feature = "otel")]
fn build_metadata_from_cfg_and_env(cfg: &TracingConfig) -> Option<MetadataMap> {
    let mut md = MetadataMap::new();

    for (k, v) in configured_headers(cfg) {
        let Ok(key) = MetadataKey::from_bytes(k.as_bytes()) else {
            tracing::warn!(header = %k, "Skipping invalid gRPC metadata header name");
            continue;
        };
        if let Ok(val) = MetadataValue::try_from(v.as_str()) {
            md.insert(key, val);
        }
    }

    if md.is_empty() { None } else { Some(md) }
}

// ===== init_tracing (feature disabled) ========================================

/// # Errors
/// Never fails when the `otel` feature is disabled.
#[cfg(not(feature = "otel"))]
pub fn init_tracing(cfg: &TracingConfig) -> anyhow::Result<Option<(OtelLayer, TracingGuard)>> {
    if cfg.enabled {
        tracing::info!("Tracing configuration provided but the otel feature is disabled");
    }
    Ok(None)
}

// ===== shutdown_tracing =======================================================

/// Flush pending spans and shut the provider down.
#[cfg(feature = "otel")]
#[allow(clippy::needless_pass_by_value)]
pub fn shutdown_tracing(guard: TracingGuard) {
    if let Err(e) = guard.provider.force_flush() {
        tracing::warn!(error = %e, "force_flush failed during tracing shutdown");
    }
    match guard.provider.shutdown() {
        Ok(()) => tracing::info!("Tracing shutdown complete"),
        Err(e) => tracing::warn!(error = %e, "Tracer provider shutdown failed"),
    }
}

#[cfg(not(feature = "otel"))]
#[allow(clippy::needless_pass_by_value)]
pub fn shutdown_tracing(_guard: TracingGuard) {
    tracing::info!("Tracing shutdown (no-op)");
}

// ===== tests ==================================================================
