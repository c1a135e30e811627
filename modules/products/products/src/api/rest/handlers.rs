use std::sync::Arc;

use axum::{
    Extension, Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use products_sdk::ProductsApi;
use svckit::{ApiResult, ValidJson, ValidPath, ValidQuery};
use uuid::Uuid;

use super::dto::{CreateProductReq, ListQuery, ProductDto};

pub async fn list_products(
    Extension(svc): Extension<Arc<dyn ProductsApi>>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> ApiResult<Json<Vec<ProductDto>>> {
    let products = svc.get_products(query.filter).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

pub async fn get_product(
    Extension(svc): Extension<Arc<dyn ProductsApi>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Response> {
    let response = match svc.get_by_id(id).await? {
        Some(product) => Json(ProductDto::from(product)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    };
    Ok(response)
}

pub async fn create_product(
    Extension(svc): Extension<Arc<dyn ProductsApi>>,
    ValidJson(req): ValidJson<CreateProductReq>,
) -> ApiResult<impl IntoResponse> {
    let product = svc.insert_product(req.into()).await?;
    Ok((StatusCode::CREATED, Json(ProductDto::from(product))))
}
