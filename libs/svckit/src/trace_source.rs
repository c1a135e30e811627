//! Named tracing spans around repository and service operations.
//!
//! Each component owns a [`TraceSource`] and runs every public method through
//! it, so each call shows up as its own `internal` span named
//! `{Component}.{operation}` under the request span.
//!
//! ```
//! use svckit::TraceSource;
//!
//! struct Inventory {
//!     trace: TraceSource,
//! }
//!
//! impl Inventory {
//!     fn count(&self) -> usize {
//!         self.trace.in_span("count", || 42)
//!     }
//! }
//!
//! let inv = Inventory { trace: TraceSource::new("Inventory") };
//! assert_eq!(inv.count(), 42);
//! ```

use std::future::Future;

use svckit_errors::Cancelled;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, field::Empty};

/// Span name shared by every traced operation; the exported name is `otel.name`.
pub const OPERATION_SPAN: &str = "traced_operation";

/// Per-component tracing handle, injected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSource {
    component: &'static str,
    version: &'static str,
}

impl TraceSource {
    #[must_use]
    pub const fn new(component: &'static str) -> Self {
        Self {
            component,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    #[must_use]
    pub const fn with_version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub const fn component(&self) -> &'static str {
        self.component
    }

    #[must_use]
    pub const fn version(&self) -> &'static str {
        self.version
    }

    /// Fully-qualified operation name, `{component}.{operation}`.
    #[must_use]
    pub fn operation_name(&self, operation: &str) -> String {
        format!("{}.{operation}", self.component)
    }

    /// New `internal` span for `operation`, parented to the current span.
    #[must_use]
    pub fn span(&self, operation: &'static str) -> Span {
        tracing::info_span!(
            OPERATION_SPAN,
            otel.name = %self.operation_name(operation),
            otel.kind = "internal",
            otel.status_code = Empty,
            component = self.component,
            operation = operation,
            "service.version" = self.version,
            error.kind = Empty,
        )
    }

    /// Run `f` inside a fresh span; the span is closed when this returns or unwinds.
    pub fn in_span<T>(&self, operation: &'static str, f: impl FnOnce() -> T) -> T {
        let span = self.span(operation);
        let _entered = span.enter();
        f()
    }

    /// Await `fut` inside a fresh span.
    ///
    /// The span closes once, when the future completes or is dropped.
    pub async fn instrument<F>(&self, operation: &'static str, fut: F) -> F::Output
    where
        F: Future,
    {
        fut.instrument(self.span(operation)).await
    }

    /// Like [`instrument`](Self::instrument), but stop waiting when `cancel` fires.
    ///
    /// A fired token yields `Err(E::from(Cancelled))` and drops `fut`; any
    /// other outcome is returned unchanged.
    ///
    /// # Errors
    /// Returns the error produced by `fut`, or the cancellation error.
    pub async fn instrument_cancellable<T, E, F>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<Cancelled>,
    {
        let span = self.span(operation);
        let record_on = span.clone();
        async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    record_on.record("error.kind", "cancelled");
                    tracing::debug!("operation cancelled before completion");
                    Err(E::from(Cancelled))
                }
                res = fut => res,
            }
        }
        .instrument(span)
        .await
    }
}
