//! User account endpoints.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{Authority, Page, User, UserId, UserStatus};
use domain::{NewUserRequest, Shop, UserEdit};
use serde::Serialize;
use store::Store;

use super::{PageParams, caller_is_admin, require_admin};
use crate::error::ApiError;

/// A user as returned to clients; the password never leaves the service.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: String,
    pub family: String,
    pub status: UserStatus,
    pub authorities: BTreeSet<Authority>,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            family: user.family,
            status: user.status,
            authorities: user.authorities,
            created: user.created,
            changed: user.changed,
        }
    }
}

/// POST /users: register an account, or create one on behalf of an admin.
#[tracing::instrument(skip(shop, headers, req))]
pub async fn create<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    headers: HeaderMap,
    Json(req): Json<NewUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let is_admin = caller_is_admin(&shop, &headers).await?;
    let user = shop.users.create_user(req, is_admin).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users: list ACTIVE and PENDING users.
#[tracing::instrument(skip(shop))]
pub async fn list<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<UserResponse>>, ApiError> {
    let page = shop.users.load_users(params.request()?).await?;
    Ok(Json(Page {
        items: page.items.into_iter().map(UserResponse::from).collect(),
        page: page.page,
        size: page.size,
        total: page.total,
    }))
}

/// GET /users/{id}
#[tracing::instrument(skip(shop))]
pub async fn get<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(shop.users.load_user(id).await?.into()))
}

/// GET /users/by-username/{username}
#[tracing::instrument(skip(shop))]
pub async fn get_by_username<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(shop.users.load_by_username(&username).await?.into()))
}

/// PUT /users/{id}: partial update; status and authorities need an admin caller.
#[tracing::instrument(skip(shop, headers, edit))]
pub async fn edit<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    headers: HeaderMap,
    Path(id): Path<UserId>,
    Json(edit): Json<UserEdit>,
) -> Result<Json<UserResponse>, ApiError> {
    let is_admin = caller_is_admin(&shop, &headers).await?;
    Ok(Json(shop.users.edit_user(id, edit, is_admin).await?.into()))
}

/// POST /users/{id}/ban
#[tracing::instrument(skip(shop, headers))]
pub async fn ban<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    headers: HeaderMap,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    require_admin(&shop, &headers).await?;
    Ok(Json(shop.users.ban_user(id).await?.into()))
}

/// POST /users/{id}/freeze
#[tracing::instrument(skip(shop, headers))]
pub async fn freeze<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    headers: HeaderMap,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    require_admin(&shop, &headers).await?;
    Ok(Json(shop.users.freeze_user(id).await?.into()))
}

/// DELETE /users/{id}: mark the account DELETED, keeping the record.
#[tracing::instrument(skip(shop))]
pub async fn safe_delete<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(shop.users.safe_delete_user(id).await?.into()))
}

/// DELETE /users/{id}/record: remove the account record. Admin only.
#[tracing::instrument(skip(shop, headers))]
pub async fn delete<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    headers: HeaderMap,
    Path(id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    require_admin(&shop, &headers).await?;
    shop.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
