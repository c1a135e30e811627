use async_trait::async_trait;
use products_sdk::Product;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, sea_query::LikeExpr,
};
use svckit::TraceSource;
use uuid::Uuid;

use crate::domain::repo::ProductsRepository;

use super::entity::{self, Entity as ProductEntity};

const LIKE_ESCAPE: char = '\\';

/// Escape LIKE metacharacters so `s` only matches itself.
fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | LIKE_ESCAPE => {
                out.push(LIKE_ESCAPE);
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

fn like_contains(s: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", like_escape(s))).escape(LIKE_ESCAPE)
}

pub struct SeaOrmProductsRepository {
    db: DatabaseConnection,
    trace: TraceSource,
}

impl SeaOrmProductsRepository {
    /// Repository traced as `ProductRepository.{operation}`.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            trace: TraceSource::new("ProductRepository").with_version(env!("CARGO_PKG_VERSION")),
        }
    }

    #[must_use]
    pub fn with_trace(mut self, trace: TraceSource) -> Self {
        self.trace = trace;
        self
    }
}

#[async_trait]
impl ProductsRepository for SeaOrmProductsRepository {
    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        self.trace
            .instrument("get_by_id", async {
                let found = ProductEntity::find_by_id(id).one(&self.db).await?;
                anyhow::Ok(found.map(Into::into))
            })
            .await
    }

    async fn get_products(&self, filter: Option<&str>) -> anyhow::Result<Vec<Product>> {
        self.trace
            .instrument("get_products", async {
                let mut query = ProductEntity::find();
                if let Some(filter) = filter {
                    query = query.filter(entity::Column::Name.like(like_contains(filter)));
                }
                let rows = query
                    .order_by_asc(entity::Column::Name)
                    .all(&self.db)
                    .await?;
                anyhow::Ok(rows.into_iter().map(Into::into).collect())
            })
            .await
    }

    async fn insert_product(&self, product: Product) -> anyhow::Result<Product> {
        self.trace
            .instrument("insert_product", async {
                let am: entity::ActiveModel = product.into();
                let model = am.insert(&self.db).await?;
                anyhow::Ok(model.into())
            })
            .await
    }

    async fn exists_by_name(&self, name: &str) -> anyhow::Result<bool> {
        self.trace
            .instrument("exists_by_name", async {
                let count = ProductEntity::find()
                    .filter(entity::Column::Name.eq(name))
                    .count(&self.db)
                    .await?;
                anyhow::Ok(count > 0)
            })
            .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(like_escape("Widget"), "Widget");
        assert_eq!(like_escape("50%"), "50\\%");
        assert_eq!(like_escape("snake_case"), "snake\\_case");
        assert_eq!(like_escape("back\\slash"), "back\\\\slash");
    }
}
