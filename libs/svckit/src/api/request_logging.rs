//! Request/response logging with bounded body capture.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, Failure};

/// Settings for [`request_logging_middleware`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestLogging {
    /// Path prefixes whose bodies are never captured (health checks, uploads).
    pub skip_body_paths: Vec<String>,
    /// Bodies larger than this, or of unknown length, are not captured.
    pub max_body_bytes: usize,
}

impl Default for RequestLogging {
    fn default() -> Self {
        Self {
            skip_body_paths: vec!["/health".to_owned()],
            max_body_bytes: 16 * 1024,
        }
    }
}

impl RequestLogging {
    #[must_use]
    pub fn skips(&self, path: &str) -> bool {
        self.skip_body_paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    fn capturable(&self, body: &Body) -> bool {
        body.size_hint()
            .upper()
            .is_some_and(|n| n <= u64::try_from(self.max_body_bytes).unwrap_or(u64::MAX))
    }
}

enum Captured {
    Body(Bytes),
    Skipped,
}

impl Captured {
    fn text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Body(bytes) => String::from_utf8_lossy(bytes),
            Self::Skipped => "<not captured>".into(),
        }
    }
}

/// Buffer `body` when it's small enough; the returned body replays it.
async fn capture(body: Body, cfg: &RequestLogging) -> Result<(Captured, Body), axum::Error> {
    if !cfg.capturable(&body) {
        return Ok((Captured::Skipped, body));
    }
    let bytes = axum::body::to_bytes(body, cfg.max_body_bytes).await?;
    Ok((Captured::Body(bytes.clone()), Body::from(bytes)))
}

/// Logs method, path, query and body of each request, then status and body
/// of its response.
///
/// Runs inside the error translation layer: failures are logged by their
/// error, and an unreadable request body becomes a validation failure for
/// the translator to render.
pub async fn request_logging_middleware(
    State(cfg): State<Arc<RequestLogging>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or_default().to_owned();

    if cfg.skips(&path) {
        tracing::info!(%method, %path, %query, "HTTP request");
        let response = next.run(request).await;
        tracing::info!(status = response.status().as_u16(), "HTTP response");
        return response;
    }

    let (parts, body) = request.into_parts();
    let request = match capture(body, &cfg).await {
        Ok((captured, body)) => {
            tracing::info!(%method, %path, %query, body = %captured.text(), "HTTP request");
            Request::from_parts(parts, body)
        }
        Err(e) => {
            tracing::info!(%method, %path, %query, error = %e, "HTTP request body could not be read");
            return ApiError::validation(format!("Failed to read request body: {e}"))
                .into_response();
        }
    };

    let response = next.run(request).await;
    let status = response.status().as_u16();

    if let Some(failure) = response.extensions().get::<Failure>() {
        tracing::info!(status, error = %failure.error(), "HTTP response");
        return response;
    }

    let (parts, body) = response.into_parts();
    match capture(body, &cfg).await {
        Ok((captured, body)) => {
            tracing::info!(status, body = %captured.text(), "HTTP response");
            Response::from_parts(parts, body)
        }
        Err(e) => {
            tracing::warn!(status, error = %e, "HTTP response body could not be read");
            Response::from_parts(parts, Body::empty())
        }
    }
}
