//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Page, Product, ProductId};
use domain::{NewProductRequest, ProductEdit, Shop};
use serde::Deserialize;
use store::Store;

use super::PageParams;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// POST /products
#[tracing::instrument(skip(shop, req))]
pub async fn create<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Json(req): Json<NewProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = shop.products.create_product(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products: list AVAILABLE products.
#[tracing::instrument(skip(shop))]
pub async fn list<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    Ok(Json(shop.products.load_products(params.request()?).await?))
}

/// GET /products/search?q=: case-insensitive match on name and description.
#[tracing::instrument(skip(shop))]
pub async fn search<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(shop.products.search(&params.q).await?))
}

/// GET /products/{id}
#[tracing::instrument(skip(shop))]
pub async fn get<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(shop.products.load_product(id).await?))
}

/// GET /products/by-name/{name}
#[tracing::instrument(skip(shop))]
pub async fn get_by_name<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(name): Path<String>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(shop.products.load_by_name(&name).await?))
}

/// PUT /products/{id}
#[tracing::instrument(skip(shop, edit))]
pub async fn edit<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<ProductId>,
    Json(edit): Json<ProductEdit>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(shop.products.edit_product(id, edit).await?))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(shop))]
pub async fn delete<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    shop.products.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
