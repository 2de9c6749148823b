//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CartId, Order, OrderId, Page, UserId};
use domain::Shop;
use serde::Deserialize;
use store::Store;

use super::PageParams;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user: UserId,
    pub cart: CartId,
}

/// POST /orders: order a cart, cancelling the user's previous open order.
#[tracing::instrument(skip(shop, req), fields(user = %req.user, cart = %req.cart))]
pub async fn create<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = shop.orders.create_order(req.user, req.cart).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{id}
#[tracing::instrument(skip(shop))]
pub async fn get<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(shop.orders.load_order(id).await?))
}

/// GET /users/{id}/orders/current: the user's OPEN order.
#[tracing::instrument(skip(shop))]
pub async fn current<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(user): Path<UserId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(shop.orders.load_current_order_by_user(user).await?))
}

/// GET /users/{id}/orders: order history of a user.
#[tracing::instrument(skip(shop))]
pub async fn list_by_user<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(user): Path<UserId>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Order>>, ApiError> {
    let page = shop
        .orders
        .load_orders_by_user(user, params.request()?)
        .await?;
    Ok(Json(page))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(shop))]
pub async fn cancel<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(shop.orders.cancel_order(id).await?))
}

/// DELETE /orders/{id}
#[tracing::instrument(skip(shop))]
pub async fn delete<S: Store + 'static>(
    State(shop): State<Arc<Shop<S>>>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, ApiError> {
    shop.orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
