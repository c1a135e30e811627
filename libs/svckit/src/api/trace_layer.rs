//! Request correlation: request id, the per-request span and the `traceid`
//! response header.

use axum::{
    Router,
    body::Body,
    extract::Request,
    middleware::{Next, from_fn},
    response::Response,
};
use http::{HeaderName, HeaderValue};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::field::Empty;

use crate::http::otel;

/// Request id header, generated when the caller didn't send one.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response header carrying the trace id of the request.
pub const TRACE_ID_HEADER: &str = "traceid";

#[must_use]
pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(REQUEST_ID_HEADER)
}

/// Generates UUID v4 request ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _req: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request id as seen by handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XRequestId(pub String);

fn request_id_of<B>(req: &http::Request<B>) -> Option<&str> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
}

/// `http_request` span for one inbound request, parented on its `traceparent`.
pub fn make_request_span(req: &http::Request<Body>) -> tracing::Span {
    let span = tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = request_id_of(req).unwrap_or("n/a"),
        status = Empty,
        latency_ms = Empty,
        "http.method" = %req.method(),
        "http.target" = %req.uri().path(),
        "user_agent.original" = req
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown"),
        trace_id = Empty,
    );

    otel::set_parent_from_headers(&span, req.headers());
    span
}

/// Trace id reported to the caller: the span's OTel id, else the inbound
/// traceparent id, else the request id.
fn response_trace_id(
    span: &tracing::Span,
    inbound: Option<String>,
    request_id: Option<&str>,
) -> Option<String> {
    otel::current_trace_id(span)
        .or(inbound)
        .or_else(|| request_id.map(str::to_owned))
}

/// Records the request id, exposes it to handlers and writes `traceid` on
/// the way out. Runs inside the request span.
pub async fn correlate_request(mut req: Request, next: Next) -> Response {
    let span = tracing::Span::current();
    let request_id = request_id_of(&req).map(str::to_owned);
    let inbound = otel::get_traceparent(req.headers()).and_then(otel::parse_trace_id);

    if let Some(rid) = &request_id {
        span.record("request_id", rid.as_str());
        req.extensions_mut().insert(XRequestId(rid.clone()));
    }

    let trace_id = response_trace_id(&span, inbound, request_id.as_deref());
    if let Some(tid) = &trace_id {
        span.record("trace_id", tid.as_str());
    }

    let mut response = next.run(req).await;

    if let Some(value) = trace_id.and_then(|tid| HeaderValue::from_str(&tid).ok()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
    }
    response
}

/// Wrap `router` with request id, tracing and correlation layers.
///
/// Runtime order, outermost first:
/// `SetRequestId` -> `PropagateRequestId` -> Trace -> `correlate_request` -> `router`.
pub fn apply_trace_layers(router: Router) -> Router {
    let header = request_id_header();

    router
        .layer(from_fn(correlate_request))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span)
                .on_response(
                    |res: &http::Response<Body>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("status", res.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                    },
                ),
        )
        .layer(PropagateRequestIdLayer::new(header.clone()))
        .layer(SetRequestIdLayer::new(header, MakeReqId))
}
