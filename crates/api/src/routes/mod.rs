//! HTTP route handlers, one module per resource.
//!
//! Handlers are generic over the store so the same router serves the
//! in-memory and the PostgreSQL deployments.

pub mod auth;
pub mod carts;
pub mod categories;
pub mod comments;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod users;

use axum::http::HeaderMap;
use common::{PageRequest, UserId};
use domain::{DomainError, Shop};
use serde::Deserialize;
use store::Store;

use crate::error::ApiError;

/// Header carrying the id of the authenticated caller.
///
/// Session handling lives in front of this service; it forwards the
/// resolved user id here.
pub const CALLER_HEADER: &str = "x-user-id";

/// `?page=&size=` query parameters of listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageParams {
    /// Validates the parameters, defaulting to the first page.
    pub fn request(&self) -> Result<PageRequest, ApiError> {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page()),
            self.size.unwrap_or(defaults.size()),
        )
        .map_err(|e| DomainError::from(e).into())
    }
}

/// Returns the caller id forwarded in [`CALLER_HEADER`], if any.
pub fn caller_id(headers: &HeaderMap) -> Result<Option<UserId>, ApiError> {
    let Some(value) = headers.get(CALLER_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|id| Some(UserId::new(id)))
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {CALLER_HEADER} header")))
}

/// Returns true if the caller is a visible user holding the admin authority.
pub async fn caller_is_admin<S: Store>(shop: &Shop<S>, headers: &HeaderMap) -> Result<bool, ApiError> {
    let Some(id) = caller_id(headers)? else {
        return Ok(false);
    };
    match shop.users.load_user(id).await {
        Ok(user) => Ok(user.is_admin()),
        Err(DomainError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Rejects callers without the admin authority.
pub async fn require_admin<S: Store>(shop: &Shop<S>, headers: &HeaderMap) -> Result<(), ApiError> {
    if caller_is_admin(shop, headers).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin authority required".to_string()))
    }
}
