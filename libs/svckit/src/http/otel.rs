//! W3C trace-context helpers for HTTP headers.
//!
//! With the `otel` feature the global OpenTelemetry propagator is used to
//! link request spans to their upstream parent. Without it only the trace id
//! is recorded for log correlation.

use http::HeaderMap;

/// W3C Trace Context header name
pub const TRACEPARENT: &str = "traceparent";

/// Raw `traceparent` header value, if present and valid UTF-8.
pub fn get_traceparent(headers: &HeaderMap) -> Option<&str> {
    headers.get(TRACEPARENT)?.to_str().ok()
}

/// Trace id of a version-00 `traceparent` (`00-{trace_id}-{span_id}-{flags}`).
///
/// All-zero and non-hex ids are rejected.
pub fn parse_trace_id(traceparent: &str) -> Option<String> {
    let mut parts = traceparent.trim().split('-');
    if parts.next()? != "00" {
        return None;
    }
    let trace_id = parts.next()?;
    let valid = trace_id.len() == 32
        && trace_id.bytes().all(|b| b.is_ascii_hexdigit())
        && trace_id.bytes().any(|b| b != b'0');
    // span id and flags must follow
    parts.next()?;
    parts.next()?;
    valid.then(|| trace_id.to_ascii_lowercase())
}

fn record_inbound_trace_id(span: &tracing::Span, headers: &HeaderMap) {
    if let Some(trace_id) = get_traceparent(headers).and_then(parse_trace_id) {
        span.record("trace_id", trace_id.as_str());
    }
}

#[cfg(feature = "otel")]
mod imp {
    use http::{HeaderMap, HeaderName};
    use opentelemetry::{global, propagation::Extractor, trace::TraceContextExt};
    use tracing::Span;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    struct HeadersExtractor<'a>(&'a HeaderMap);

    impl Extractor for HeadersExtractor<'_> {
        fn get(&self, key: &str) -> Option<&str> {
            self.0.get(key).and_then(|v| v.to_str().ok())
        }

        fn keys(&self) -> Vec<&str> {
            self.0.keys().map(HeaderName::as_str).collect()
        }
    }

    /// Parent `span` on the context carried by inbound `headers`.
    pub fn set_parent_from_headers(span: &Span, headers: &HeaderMap) {
        let parent_cx = global::get_text_map_propagator(|propagator| {
            propagator.extract(&HeadersExtractor(headers))
        });
        let _ = span.set_parent(parent_cx);
        super::record_inbound_trace_id(span, headers);
    }

    /// OpenTelemetry trace id of `span`, when an OTel layer is installed.
    pub fn current_trace_id(span: &Span) -> Option<String> {
        let cx = span.context();
        let span_ref = cx.span();
        let sc = span_ref.span_context();
        sc.is_valid().then(|| sc.trace_id().to_string())
    }
}

#[cfg(not(feature = "otel"))]
mod imp {
    use http::HeaderMap;
    use tracing::Span;

    pub fn set_parent_from_headers(span: &Span, headers: &HeaderMap) {
        super::record_inbound_trace_id(span, headers);
    }

    pub fn current_trace_id(_span: &Span) -> Option<String> {
        None
    }
}

pub use imp::{current_trace_id, set_parent_from_headers};
