#![allow(dead_code)]

use std::sync::Arc;

use products::{Migrator, ProductService, ProductsConfig, SeaOrmProductsRepository};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;

pub async fn inmem_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn sqlite_service(config: ProductsConfig) -> Arc<ProductService> {
    let repo = SeaOrmProductsRepository::new(inmem_db().await);
    Arc::new(ProductService::new(
        Arc::new(repo),
        config,
        CancellationToken::new(),
    ))
}
