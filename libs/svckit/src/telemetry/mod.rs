//! Telemetry utilities for OpenTelemetry integration
//!
//! Builds the OTLP export pipeline whose layer is attached to the
//! `tracing_subscriber` registry by [`crate::bootstrap::logging`].

pub mod config;
pub mod init;

pub use config::{Exporter, ExporterKind, Sampler, TracingConfig};
pub use init::{OtelLayer, TracingGuard, init_tracing, shutdown_tracing};
