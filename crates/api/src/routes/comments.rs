//! Product comment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Comment, CommentId, CommentStatus, Page, ProductId, UserId};
use domain::{NewCommentRequest, Shop};
use serde::Deserialize;
use store::Store;

use super::PageParams;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: CommentStatus,
}

/// POST /comments
#[tracing::instrument(skip(shop, req))]
pub async fn create<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Json(req): Json<NewCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = shop.comments.create_comment(req).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /comments
#[tracing::instrument(skip(shop))]
pub async fn list<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Comment>>, ApiError> {
    Ok(Json(shop.comments.load_comments(params.request()?).await?))
}

/// GET /comments/{id}
#[tracing::instrument(skip(shop))]
pub async fn get<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<CommentId>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(shop.comments.load_comment(id).await?))
}

/// GET /users/{id}/comments
#[tracing::instrument(skip(shop))]
pub async fn list_by_user<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(user): Path<UserId>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Comment>>, ApiError> {
    let page = shop
        .comments
        .load_comments_by_user(user, params.request()?)
        .await?;
    Ok(Json(page))
}

/// GET /products/{id}/comments: SUBMIT comments of a product.
#[tracing::instrument(skip(shop))]
pub async fn list_by_product<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(product): Path<ProductId>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Comment>>, ApiError> {
    let page = shop
        .comments
        .load_comments_by_product(product, params.request()?)
        .await?;
    Ok(Json(page))
}

/// PUT /comments/{id}/status
#[tracing::instrument(skip(shop, req))]
pub async fn change_status<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<CommentId>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(shop.comments.change_status(id, req.status).await?))
}

/// DELETE /comments/{id}
#[tracing::instrument(skip(shop))]
pub async fn delete<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<CommentId>,
) -> Result<StatusCode, ApiError> {
    shop.comments.delete_comment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
