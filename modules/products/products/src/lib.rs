//! Products module
//!
//! - `domain`: validation rules, the repository port and `ProductService`
//! - `infra::storage`: sea-orm entity, repository and migrations
//! - `api::rest`: DTOs, handlers and routes
//! - `resources`: default message catalog for error codes
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod resources;

pub use config::ProductsConfig;
pub use domain::service::ProductService;
pub use infra::storage::{Migrator, SeaOrmProductsRepository};
