//! Products SDK
//!
//! Public contract of the products module:
//! - `ProductsApi` trait
//! - Model types (`Product`, `NewProduct`)
//!
//! Failures are reported as `svckit_errors::ServiceError`, so callers see
//! broken rules, validation failures and cancellation as distinct kinds.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod models;

pub use api::ProductsApi;
pub use models::{NewProduct, Product};
