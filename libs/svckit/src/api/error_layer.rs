//! Exception translation for axum
//!
//! The single seam that turns a [`ServiceError`] escaping a handler into the
//! JSON error contract:
//! - broken rules: 400 with one `ErrorDetail` per rule, in order
//! - validation failures: 400 with one `Validation_Error` detail
//! - cancellation: 499, empty body, connection closed
//! - anything else: 500 with an `ExceptionDetail`
//!
//! Handlers and extractors only attach a [`Failure`] to the response; the
//! middleware here renders it and logs it exactly once.

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{HeaderValue, StatusCode, header};
use serde_json::Value;
use svckit_errors::{
    BrokenRuleError, ErrorDetail, ExceptionDetail, ExceptionDiagnostic, ResourceProvider,
    ServiceError, Severity, UNHANDLED_EXCEPTION_CODE, format_template,
};

use super::error::{Failure, client_closed_request};

/// Outcome of classifying one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// Broken rules or a validation failure.
    BadRequest(Vec<ErrorDetail>),
    /// The caller is gone; nothing is written.
    ClientClosed,
    /// Unclassified failure.
    Internal(ExceptionDetail),
}

impl Translation {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ClientClosed => client_closed_request(),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Pretty-printed JSON body, `None` when nothing is written.
    ///
    /// # Errors
    /// Returns an error if the body cannot be serialized.
    pub fn body(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
        match self {
            Self::BadRequest(details) => serde_json::to_vec_pretty(details).map(Some),
            Self::ClientClosed => Ok(None),
            Self::Internal(detail) => serde_json::to_vec_pretty(detail).map(Some),
        }
    }
}

/// Maps failures to responses using the configured message catalog.
pub struct ErrorTranslator {
    resources: Arc<dyn ResourceProvider>,
    diagnostics: bool,
}

impl std::fmt::Debug for ErrorTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorTranslator")
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl ErrorTranslator {
    /// Translator with diagnostics off.
    #[must_use]
    pub fn new(resources: Arc<dyn ResourceProvider>) -> Self {
        Self {
            resources,
            diagnostics: false,
        }
    }

    /// Include the failure chain in 500 responses.
    ///
    /// Only meant for development environments; production callers must
    /// never see internal error text.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    #[must_use]
    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    /// Classify `err`. Pure function of its state and the catalog.
    #[must_use]
    pub fn translate(&self, err: &ServiceError) -> Translation {
        match err {
            ServiceError::BusinessRuleViolation(rules) => {
                Translation::BadRequest(self.rule_details(rules))
            }
            ServiceError::ValidationFailure { message } => {
                Translation::BadRequest(vec![ErrorDetail::validation(message.clone())])
            }
            ServiceError::Cancelled(_) => Translation::ClientClosed,
            ServiceError::Unclassified(source) => Translation::Internal(ExceptionDetail {
                error_message: self.message(UNHANDLED_EXCEPTION_CODE, &[]),
                exception: self
                    .diagnostics
                    .then(|| ExceptionDiagnostic::from_anyhow(source)),
            }),
        }
    }

    /// Render the full response for `err`.
    #[must_use]
    pub fn render(&self, err: &ServiceError) -> Response {
        render_translation(&self.translate(err))
    }

    fn rule_details(&self, rules: &BrokenRuleError) -> Vec<ErrorDetail> {
        rules
            .rules()
            .iter()
            .map(|rule| ErrorDetail {
                error_code: rule.error_code().to_owned(),
                error_message: self.message(rule.error_code(), rule.parameters()),
                error_type: rule.rule_type().to_owned(),
                severity: rule.severity().as_str().to_owned(),
            })
            .collect()
    }

    /// Resolve `code` and apply `params`; an unknown code falls back to itself.
    fn message(&self, code: &str, params: &[Value]) -> String {
        match self.resources.resolve(code) {
            Ok(template) if params.is_empty() => template,
            Ok(template) => format_template(&template, params),
            Err(e) => {
                tracing::warn!(error_code = code, error = %e, "Missing message resource, using the error code");
                code.to_owned()
            }
        }
    }
}

/// Write a translated failure as a response.
fn render_translation(translation: &Translation) -> Response {
    let status = translation.status();

    match translation.body() {
        Ok(Some(bytes)) => (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            bytes,
        )
            .into_response(),
        Ok(None) => (
            status,
            [(header::CONNECTION, HeaderValue::from_static("close"))],
            Body::empty(),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize error response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn log_failure(err: &ServiceError) {
    match err {
        ServiceError::BusinessRuleViolation(rules) => {
            if rules.max_severity() >= Severity::Error {
                tracing::warn!(rules = %rules, "Request rejected by business rules");
            } else {
                tracing::info!(rules = %rules, "Request rejected by business rules");
            }
        }
        ServiceError::ValidationFailure { message } => {
            tracing::info!(%message, "Request failed validation");
        }
        ServiceError::Cancelled(_) => {
            tracing::debug!("Request cancelled before a response was produced");
        }
        ServiceError::Unclassified(source) => {
            tracing::error!(error = ?source, "Unhandled error while processing request");
        }
    }
}

/// Middleware that renders any [`Failure`] attached by the inner service.
///
/// Successful responses and plain status responses (404, 201, ...) pass
/// through untouched.
pub async fn error_translation_middleware(
    State(translator): State<Arc<ErrorTranslator>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<Failure>() {
        Some(failure) => {
            log_failure(failure.error());
            translator.render(failure.error())
        }
        None => response,
    }
}

/// `CatchPanicLayer` handler: a panicking handler becomes an unclassified failure.
pub fn panic_to_failure(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(s) => (*s).to_owned(),
            Err(_) => "non-string panic payload".to_owned(),
        },
    };

    let err = ServiceError::Unclassified(anyhow::anyhow!("handler panicked: {detail}"));
    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response.extensions_mut().insert(Failure(Arc::new(err)));
    response
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;
    use svckit_errors::{BrokenRule, Cancelled, ErrorCode, StaticResourceProvider};

    fn translator() -> ErrorTranslator {
        let resources = StaticResourceProvider::default().with_overrides([
            ("Name_Required", "Name is required"),
            ("Product_AlreadyExists", "Product {0} already exists"),
            ("Name_TooLong", "Name must be at most {0} characters"),
            ("UnhandledException", "An unexpected error occurred"),
        ]);
        ErrorTranslator::new(Arc::new(resources))
    }

    #[test]
    fn single_rule_without_parameters() {
        let t = translator();
        let err = ServiceError::from(BrokenRule::error(ErrorCode::from_static("Name_Required")));

        let translation = t.translate(&err);
        assert_eq!(translation.status(), StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_slice(&translation.body().unwrap().unwrap()).unwrap();
        assert_eq!(
            body,
            json!([{
                "errorCode": "Name_Required",
                "errorMessage": "Name is required",
                "errorType": "BrokenRule",
                "severity": "Error"
            }])
        );
    }

    #[test]
    fn parameters_are_formatted_into_message() {
        let t = translator();
        let err = ServiceError::from(
            BrokenRule::error(ErrorCode::from_static("Product_AlreadyExists"))
                .with_params(["Widget"]),
        );

        let Translation::BadRequest(details) = t.translate(&err) else {
            panic!("expected bad request");
        };
        assert_eq!(details[0].error_message, "Product Widget already exists");
    }

    #[test]
    fn rules_keep_count_and_order() {
        let t = translator();
        let rules = BrokenRuleError::new([
            BrokenRule::error(ErrorCode::from_static("Name_TooLong")).with_params([100]),
            BrokenRule::new(ErrorCode::from_static("Name_Required"), Severity::Warning)
                .with_type("ProductNameRule"),
            BrokenRule::error(ErrorCode::from_static("Product_AlreadyExists")).with_params(["x"]),
        ])
        .unwrap();

        let Translation::BadRequest(details) = t.translate(&rules.into()) else {
            panic!("expected bad request");
        };
        let codes: Vec<_> = details.iter().map(|d| d.error_code.as_str()).collect();
        assert_eq!(codes, ["Name_TooLong", "Name_Required", "Product_AlreadyExists"]);
        assert_eq!(details[0].error_message, "Name must be at most 100 characters");
        assert_eq!(details[1].error_type, "ProductNameRule");
        assert_eq!(details[1].severity, "Warning");
    }

    #[test]
    fn validation_failure_is_single_fixed_detail() {
        let t = translator();
        let translation = t.translate(&ServiceError::validation("Filter must not be empty"));

        assert_eq!(translation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            translation,
            Translation::BadRequest(vec![ErrorDetail {
                error_code: "Validation_Error".to_owned(),
                error_message: "Filter must not be empty".to_owned(),
                error_type: "Validation Error".to_owned(),
                severity: "Warning".to_owned(),
            }])
        );
    }

    #[test]
    fn unclassified_hides_diagnostics_by_default() {
        let t = translator();
        let err = ServiceError::Unclassified(anyhow::anyhow!("db timeout").context("loading"));

        let translation = t.translate(&err);
        assert_eq!(translation.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(translation.body().unwrap().unwrap()).unwrap();
        assert!(body.contains("An unexpected error occurred"));
        assert!(!body.contains("db timeout"));
        assert!(!body.contains("exception"));
    }

    #[test]
    fn unclassified_carries_chain_in_diagnostic_mode() {
        let t = translator().with_diagnostics(true);
        let err = ServiceError::Unclassified(anyhow::anyhow!("db timeout").context("loading"));

        let Translation::Internal(detail) = t.translate(&err) else {
            panic!("expected internal");
        };
        let diag = detail.exception.unwrap();
        assert_eq!(diag.message, "loading");
        assert_eq!(diag.causes, ["db timeout"]);
    }

    #[test]
    fn cancellation_writes_nothing() {
        let t = translator();
        let translation = t.translate(&Cancelled.into());
        assert_eq!(translation, Translation::ClientClosed);
        assert_eq!(translation.status().as_u16(), 499);
        assert!(translation.body().unwrap().is_none());

        let response = t.render(&Cancelled.into());
        assert_eq!(response.headers()[header::CONNECTION], "close");
    }

    #[test]
    fn unknown_code_falls_back_to_code() {
        let t = translator();
        let rule = BrokenRule::error(ErrorCode::from_static("Mystery_Rule")).with_params([1]);
        let err = ServiceError::from(rule);

        let Translation::BadRequest(details) = t.translate(&err) else {
            panic!("expected bad request");
        };
        assert_eq!(details[0].error_message, "Mystery_Rule");
    }

    #[test]
    fn translation_is_deterministic() {
        let t = translator();
        let err = ServiceError::from(
            BrokenRuleError::new([
                BrokenRule::error(ErrorCode::from_static("Name_Required")),
                BrokenRule::error(ErrorCode::from_static("Product_AlreadyExists"))
                    .with_params(["Widget"]),
            ])
            .unwrap(),
        );

        let first = t.translate(&err).body().unwrap().unwrap();
        let second = t.translate(&err).body().unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rendered_body_is_pretty_json() {
        let t = translator();
        let response = t.render(&ServiceError::validation("bad"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn panic_payloads_become_unclassified() {
        let response = panic_to_failure(Box::new("boom"));
        let failure = response.extensions().get::<Failure>().unwrap();
        assert_eq!(failure.error().kind(), "unclassified");
        assert_eq!(failure.error().to_string(), "handler panicked: boom");

        let response = panic_to_failure(Box::new(String::from("owned boom")));
        let failure = response.extensions().get::<Failure>().unwrap();
        assert!(failure.error().to_string().contains("owned boom"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn middleware_logs_each_failure_once() {
        use axum::{Router, middleware::from_fn_with_state, routing::get};
        use tower::ServiceExt;

        async fn failing() -> Result<(), crate::api::ApiError> {
            Err(anyhow::anyhow!("db down").into())
        }

        let app = Router::new()
            .route("/fail", get(failing))
            .layer(from_fn_with_state(
                Arc::new(translator()),
                error_translation_middleware,
            ));

        let response = app
            .oneshot(http::Request::get("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<Failure>().is_none());
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|l| l.contains("Unhandled error while processing request"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one error log, got {n}")),
            }
        });
    }
}
