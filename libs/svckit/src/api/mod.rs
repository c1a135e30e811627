//! HTTP boundary: handler errors, extractors and the middleware stack.

pub mod error;
pub mod error_layer;
pub mod extract;
pub mod request_logging;
pub mod trace_layer;

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state};
use tower_http::catch_panic::CatchPanicLayer;

pub use error::{ApiError, ApiResult, Failure};
pub use error_layer::{ErrorTranslator, Translation, error_translation_middleware};
pub use extract::{ValidJson, ValidPath, ValidQuery};
pub use request_logging::{RequestLogging, request_logging_middleware};
pub use trace_layer::{REQUEST_ID_HEADER, TRACE_ID_HEADER, XRequestId};

/// Apply the full middleware stack to `router`.
///
/// Layers are registered innermost first. Runtime order, outermost first:
/// `SetRequestId` -> `PropagateRequestId` -> Trace -> correlation ->
/// error translation -> request logging -> panic capture -> router.
///
/// Every [`error::Failure`], including one raised by request logging, is
/// rendered and logged by the translation layer.
pub fn apply_middleware_stack(
    router: Router,
    translator: Arc<ErrorTranslator>,
    logging: Arc<RequestLogging>,
) -> Router {
    // panics become unclassified failures for the translation layer
    let router = router.layer(CatchPanicLayer::custom(error_layer::panic_to_failure));

    let router = router
        .layer(from_fn_with_state(logging, request_logging_middleware))
        .layer(from_fn_with_state(translator, error_translation_middleware));

    trace_layer::apply_trace_layers(router)
}
