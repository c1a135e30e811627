//! Handler-side error type.
//!
//! Handlers never render error bodies. An [`ApiError`] becomes a placeholder
//! response that carries the failure in its extensions; the translation
//! middleware picks it up and writes the wire contract.

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use svckit_errors::{BrokenRule, BrokenRuleError, ServiceError};

/// Failure attached to a response by [`ApiError::into_response`].
#[derive(Debug, Clone)]
pub struct Failure(pub Arc<ServiceError>);

impl Failure {
    #[must_use]
    pub fn error(&self) -> &ServiceError {
        &self.0
    }
}

/// Error returned by axum handlers.
#[derive(Debug)]
pub struct ApiError(ServiceError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self(ServiceError::validation(message))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<BrokenRuleError> for ApiError {
    fn from(err: BrokenRuleError) -> Self {
        Self(err.into())
    }
}

impl From<BrokenRule> for ApiError {
    fn from(rule: BrokenRule) -> Self {
        Self(rule.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(ServiceError::Unclassified(err))
    }
}

/// Status the translated response will carry for `err`.
#[must_use]
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::BusinessRuleViolation(_) | ServiceError::ValidationFailure { .. } => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::Cancelled(_) => client_closed_request(),
        ServiceError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Non-standard 499, used when the caller went away before the response.
#[must_use]
pub fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = status_for(&self.0).into_response();
        response.extensions_mut().insert(Failure(Arc::new(self.0)));
        response
    }
}
