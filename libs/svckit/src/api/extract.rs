//! Extractors that report malformed input as validation failures.
//!
//! Drop-in replacements for axum's `Json`, `Query` and `Path`: instead of
//! axum's plain-text rejections, a bad body, query string or path segment
//! ends up as a `Validation_Error` detail from the translation middleware.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    response::{IntoResponse, Response},
};
use http::request::Parts;
use serde::{Serialize, de::DeserializeOwned};
use svckit_errors::ServiceError;

use super::error::ApiError;

/// Rejections with a server-error status point at a routing defect, not at
/// the caller's input.
fn rejection_to_error(status: http::StatusCode, text: String) -> ApiError {
    if status.is_server_error() {
        ServiceError::Unclassified(anyhow::anyhow!(text)).into()
    } else {
        ApiError::validation(text)
    }
}

/// JSON request body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(rejection.status(), rejection.body_text())),
        }
    }
}

impl<T: Serialize> IntoResponse for ValidJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

/// Query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(rejection.status(), rejection.body_text())),
        }
    }
}

/// Path parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(rejection.status(), rejection.body_text())),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::api::error::Failure;
    use axum::{Router, body::Body, routing::get, routing::post};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Filter {
        limit: u32,
    }

    fn router() -> Router {
        Router::new()
            .route("/body", post(|ValidJson(p): ValidJson<Payload>| async move { p.name }))
            .route(
                "/query",
                get(|ValidQuery(f): ValidQuery<Filter>| async move { f.limit.to_string() }),
            )
            .route(
                "/items/{id}",
                get(|ValidPath(id): ValidPath<u64>| async move { id.to_string() }),
            )
    }

    async fn failure_kind(req: http::Request<Body>) -> &'static str {
        let response = router().oneshot(req).await.unwrap();
        response.extensions().get::<Failure>().unwrap().error().kind()
    }

    #[tokio::test]
    async fn malformed_body_is_validation_failure() {
        let req = http::Request::post("/body")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert_eq!(failure_kind(req).await, "validation_failure");
    }

    #[tokio::test]
    async fn bad_query_is_validation_failure() {
        let req = http::Request::get("/query?limit=lots")
            .body(Body::empty())
            .unwrap();
        assert_eq!(failure_kind(req).await, "validation_failure");
    }

    #[tokio::test]
    async fn bad_path_is_validation_failure() {
        let req = http::Request::get("/items/abc").body(Body::empty()).unwrap();
        assert_eq!(failure_kind(req).await, "validation_failure");
    }

    #[tokio::test]
    async fn good_input_passes_through() {
        let req = http::Request::get("/items/42").body(Body::empty()).unwrap();
        let response = router().oneshot(req).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert!(response.extensions().get::<Failure>().is_none());
    }
}
