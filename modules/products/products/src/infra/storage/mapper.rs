use products_sdk::Product;
use sea_orm::ActiveValue;

use super::entity;

impl From<entity::Model> for Product {
    fn from(m: entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            created_on: m.created_on,
        }
    }
}

impl From<Product> for entity::ActiveModel {
    fn from(p: Product) -> Self {
        Self {
            id: ActiveValue::Set(p.id),
            name: ActiveValue::Set(p.name),
            created_on: ActiveValue::Set(p.created_on),
        }
    }
}
