//! `ProductsApi` trait definition.

use async_trait::async_trait;
use svckit_errors::ServiceError;
use uuid::Uuid;

use crate::models::{NewProduct, Product};

/// Public API of the products module.
#[async_trait]
pub trait ProductsApi: Send + Sync {
    /// Get a product by id; `Ok(None)` when it doesn't exist.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, ServiceError>;

    /// List products, optionally filtered by a name fragment.
    ///
    /// A blank filter is a validation failure; `None` lists everything.
    async fn get_products(&self, filter: Option<String>) -> Result<Vec<Product>, ServiceError>;

    /// Validate and store a new product.
    ///
    /// Every violated rule is reported at once in a single
    /// `ServiceError::BusinessRuleViolation`.
    async fn insert_product(&self, new_product: NewProduct) -> Result<Product, ServiceError>;
}
