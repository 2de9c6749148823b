//! Shopping cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Cart, CartId, CartStatus, Decimal, LineItem, ProductId, UserId};
use domain::Shop;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub user: UserId,
    pub product: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct LineResponse {
    #[serde(flatten)]
    pub item: LineItem,
    pub total: Decimal,
}

/// A cart with its derived line and cart totals.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: CartId,
    pub user: UserId,
    pub status: CartStatus,
    pub items: Vec<LineResponse>,
    pub total: Decimal,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

impl TryFrom<Cart> for CartResponse {
    type Error = ApiError;

    fn try_from(cart: Cart) -> Result<Self, ApiError> {
        let total = domain::calculate_total(&cart)?;
        let items = cart
            .items
            .into_iter()
            .map(|item| -> Result<LineResponse, ApiError> {
                Ok(LineResponse {
                    total: domain::line_total(&item)?,
                    item,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: cart.id,
            user: cart.user,
            status: cart.status,
            items,
            total,
            created: cart.created,
            changed: cart.changed,
        })
    }
}

/// POST /carts/items: add a product to the user's open cart.
#[tracing::instrument(skip(shop, req), fields(user = %req.user, product = %req.product))]
pub async fn add_item<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = shop
        .carts
        .create_or_update_cart(req.user, req.product, req.quantity)
        .await?;
    Ok(Json(CartResponse::try_from(cart)?))
}

/// GET /carts/{id}
#[tracing::instrument(skip(shop))]
pub async fn get<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<CartId>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = shop.carts.load_cart(id).await?;
    Ok(Json(CartResponse::try_from(cart)?))
}

/// GET /users/{id}/cart: the user's open cart.
#[tracing::instrument(skip(shop))]
pub async fn get_open<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(user): Path<UserId>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = shop.carts.load_open_cart_for_user(user).await?;
    Ok(Json(CartResponse::try_from(cart)?))
}

/// DELETE /carts/{id}
#[tracing::instrument(skip(shop))]
pub async fn delete<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<CartId>,
) -> Result<StatusCode, ApiError> {
    shop.carts.delete_cart(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
