use async_trait::async_trait;
use products_sdk::Product;

/// Storage port for products.
#[async_trait]
pub trait ProductsRepository: Send + Sync {
    async fn get_by_id(&self, id: uuid::Uuid) -> anyhow::Result<Option<Product>>;

    /// Products whose name contains `filter`, ordered by name. `None` lists all.
    async fn get_products(&self, filter: Option<&str>) -> anyhow::Result<Vec<Product>>;

    async fn insert_product(&self, product: Product) -> anyhow::Result<Product>;

    async fn exists_by_name(&self, name: &str) -> anyhow::Result<bool>;
}
