//! Public models for the products module.

use time::OffsetDateTime;
use uuid::Uuid;

/// A stored product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub created_on: OffsetDateTime,
}

/// Data for creating a product. A missing id is generated on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub id: Option<Uuid>,
    pub name: String,
}

impl NewProduct {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}
