//! Service toolkit for the products service.
//!
//! - [`TraceSource`]: named `internal` spans around repository and service calls
//! - [`api`]: handler errors, validated extractors and the middleware stack
//!   (request id, request span, `traceid` header, request logging, error
//!   translation, panic capture)
//! - [`telemetry`]: OTLP exporter setup
//! - [`bootstrap`]: layered configuration, logging and shutdown signals
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod bootstrap;
pub mod http;
pub mod telemetry;
pub mod trace_source;

pub use api::{ApiError, ApiResult, ErrorTranslator, ValidJson, ValidPath, ValidQuery};
pub use trace_source::{OPERATION_SPAN, TraceSource};

// Error model, re-exported so modules depend on one crate.
pub use svckit_errors as errors;
