use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use products_sdk::ProductsApi;

use super::handlers;

/// Product routes, with `service` available to handlers as an extension.
#[must_use]
pub fn router(service: Arc<dyn ProductsApi>) -> Router {
    Router::new()
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/products/{id}", get(handlers::get_product))
        .layer(Extension(service))
}
