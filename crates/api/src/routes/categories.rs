//! Category endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Category, CategoryId, Page};
use domain::{CategoryEdit, Shop};
use serde::Deserialize;
use store::Store;

use super::PageParams;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// POST /categories
#[tracing::instrument(skip(shop, req))]
pub async fn create<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = shop.categories.create_category(&req.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /categories
#[tracing::instrument(skip(shop))]
pub async fn list<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Category>>, ApiError> {
    Ok(Json(shop.categories.load_categories(params.request()?).await?))
}

/// GET /categories/{id}
#[tracing::instrument(skip(shop))]
pub async fn get<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(shop.categories.load_category(id).await?))
}

/// GET /categories/by-name/{name}
#[tracing::instrument(skip(shop))]
pub async fn get_by_name<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(name): Path<String>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(shop.categories.load_by_name(&name).await?))
}

/// PUT /categories/{id}
#[tracing::instrument(skip(shop, edit))]
pub async fn edit<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<CategoryId>,
    Json(edit): Json<CategoryEdit>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(shop.categories.edit_category(id, edit).await?))
}

/// DELETE /categories/{id}
#[tracing::instrument(skip(shop))]
pub async fn delete<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, ApiError> {
    shop.categories.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
