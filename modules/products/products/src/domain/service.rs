//! Product service: validation and orchestration over the repository.

use std::sync::Arc;

use async_trait::async_trait;
use products_sdk::{NewProduct, Product, ProductsApi};
use svckit::TraceSource;
use svckit_errors::{BrokenRules, ServiceError};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::repo::ProductsRepository;
use super::rules;
use crate::config::ProductsConfig;

pub struct ProductService {
    repo: Arc<dyn ProductsRepository>,
    config: ProductsConfig,
    cancel: CancellationToken,
    trace: TraceSource,
}

impl ProductService {
    /// Service traced as `ProductService.{operation}`.
    ///
    /// `cancel` aborts in-flight operations with `ServiceError::Cancelled`.
    /// Owners should fire it only once callers can no longer be answered.
    #[must_use]
    pub fn new(
        repo: Arc<dyn ProductsRepository>,
        config: ProductsConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            repo,
            config,
            cancel,
            trace: TraceSource::new("ProductService").with_version(env!("CARGO_PKG_VERSION")),
        }
    }

    #[must_use]
    pub fn with_trace(mut self, trace: TraceSource) -> Self {
        self.trace = trace;
        self
    }
}

#[async_trait]
impl ProductsApi for ProductService {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, ServiceError> {
        self.trace
            .instrument_cancellable("get_by_id", &self.cancel, async {
                tracing::debug!(%id, "loading product");
                self.repo.get_by_id(id).await.map_err(ServiceError::from)
            })
            .await
    }

    async fn get_products(&self, filter: Option<String>) -> Result<Vec<Product>, ServiceError> {
        self.trace
            .instrument_cancellable::<_, ServiceError, _>("get_products", &self.cancel, async {
                if filter.as_deref().is_some_and(|f| f.trim().is_empty()) {
                    return Err(ServiceError::validation("Filter must not be empty"));
                }
                let products = self.repo.get_products(filter.as_deref()).await?;
                tracing::debug!(count = products.len(), "listed products");
                Ok(products)
            })
            .await
    }

    async fn insert_product(&self, new_product: NewProduct) -> Result<Product, ServiceError> {
        self.trace
            .instrument_cancellable::<_, ServiceError, _>("insert_product", &self.cancel, async {
                let name = new_product.name.trim().to_owned();

                let mut broken = BrokenRules::new();
                rules::check_name(&mut broken, &name, self.config.max_name_len);
                if !name.is_empty() && self.repo.exists_by_name(&name).await? {
                    broken.push(rules::already_exists(&name));
                }
                broken.into_result()?;

                let product = Product {
                    id: new_product.id.unwrap_or_else(Uuid::now_v7),
                    name,
                    created_on: OffsetDateTime::now_utc(),
                };
                let stored = self.repo.insert_product(product).await?;
                tracing::info!(id = %stored.id, name = %stored.name, "product created");
                Ok(stored)
            })
            .await
    }
}
