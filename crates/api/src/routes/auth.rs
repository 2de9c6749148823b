//! Credential check consumed by the session layer.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::Shop;
use serde::Deserialize;
use store::Store;

use super::users::UserResponse;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/login: returns the account matching the credentials.
#[tracing::instrument(skip(shop, req), fields(username = %req.username))]
pub async fn login<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = shop.users.authenticate(&req.username, &req.password).await?;
    Ok(Json(user.into()))
}
