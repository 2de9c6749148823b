//! Order lifecycle.
//!
//! A user has at most one OPEN order. Creating an order cancels the previous
//! OPEN one, prices the cart through the [`DiscountEngine`] and stores the
//! new order, all in one transaction. Three layers keep the invariant under
//! concurrency:
//!
//! 1. [`UserLocks`] serializes order creation per user inside this process.
//! 2. The transaction locks the user's row, serializing across processes
//!    sharing a PostgreSQL database.
//! 3. The store rejects a second OPEN order for a user; the loser gets
//!    [`DomainError::Conflict`] and may retry.

use std::sync::Arc;

use cache::{CacheKey, EntityCache, KindCache, Lookup};
use common::{CartId, CartStatus, NewOrder, Order, OrderId, OrderStatus, Page, PageRequest, UserId};
use store::{ONE_OPEN_ORDER_PER_USER, Store, Transaction};

use crate::cart::{calculate_total, check_orderable, load_cart_in};
use crate::discount::DiscountEngine;
use crate::locks::UserLocks;
use crate::lookup::Lookups;
use crate::{DomainError, Result};

/// Service for creating and cancelling orders.
///
/// Orders are cached under `order:byId/<id>`; the OPEN order of a user under
/// `order:currentByUser/<user>`.
pub struct OrderService<S: Store> {
    store: S,
    cache: KindCache,
    discount: Arc<dyn DiscountEngine>,
    locks: UserLocks,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S, cache: Arc<dyn EntityCache>, discount: Arc<dyn DiscountEngine>) -> Self {
        Self {
            store,
            cache: KindCache::new("order", cache),
            discount,
            locks: UserLocks::new(),
        }
    }

    fn id_key(&self, id: OrderId) -> CacheKey {
        self.cache.key("byId", id)
    }

    fn current_key(&self, user: UserId) -> CacheKey {
        self.cache.key("currentByUser", user)
    }

    /// Places an order for `user` from `cart`.
    ///
    /// Any OPEN order of the user is cancelled first. The order's price is
    /// the cart total; its total is the price after the discount granted by
    /// the engine. The cart is marked ORDERED.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, user: UserId, cart: CartId) -> Result<Order> {
        let _guard = self.locks.lock(user).await;

        let mut tx = self.store.begin().await?;
        tx.lock_user(user).await?;
        tx.user_by_id(user).await?;

        let mut cart = load_cart_in(tx.as_mut(), cart).await?;
        if cart.user != user {
            return Err(DomainError::bad_request(format!(
                "Cart ({}) does not belong to user ({user})",
                cart.id
            )));
        }

        let previous = self.cancel_open_order_in(tx.as_mut(), user).await?;

        let price = check_orderable(calculate_total(&cart)?)?;
        let discount = self.discount.apply_promotion(&cart);
        let order = match tx
            .insert_order(NewOrder::open(user, cart.id, price, discount))
            .await
        {
            Ok(order) => order,
            Err(e) if e.violates(ONE_OPEN_ORDER_PER_USER) => {
                metrics::counter!("order_conflicts_total").increment(1);
                tracing::warn!(%user, "Concurrent order creation detected");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        if cart.status.is_active() {
            cart.status = CartStatus::Ordered;
            tx.update_cart(&cart).await?;
        }
        tx.commit().await?;

        let mut stale = vec![self.id_key(order.id), self.current_key(user)];
        if let Some(previous) = &previous {
            stale.push(self.id_key(previous.id));
            metrics::counter!("orders_cancelled_total").increment(1);
        }
        self.cache.evict_all(&stale).await;
        metrics::counter!("orders_created_total").increment(1);

        tracing::debug!(
            order_id = %order.id,
            cancelled = ?previous.map(|o| o.id),
            price = %order.price,
            total = %order.total,
            "Order persisted"
        );
        Ok(order)
    }

    async fn cancel_open_order_in(
        &self,
        tx: &mut dyn Transaction,
        user: UserId,
    ) -> Result<Option<Order>> {
        let Some(mut open) = tx
            .find_order_by_user_and_status(user, OrderStatus::Open)
            .await?
        else {
            return Ok(None);
        };

        open.status = OrderStatus::Cancel;
        let cancelled = tx.update_order(&open).await?;
        tracing::debug!(order_id = %cancelled.id, "Order status changed from OPEN to CANCEL");
        Ok(Some(cancelled))
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_order(&self, id: OrderId) -> Result<Order> {
        let key = self.id_key(id);
        let token = match self.cache.get(&key).await {
            Lookup::Hit(order) => return Ok(order),
            Lookup::Miss(token) => token,
        };

        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", id))?;
        tx.commit().await?;

        self.cache.fill(key, &order, token).await?;
        Ok(order)
    }

    /// Loads the user's OPEN order.
    #[tracing::instrument(skip(self))]
    pub async fn load_current_order_by_user(&self, user: UserId) -> Result<Order> {
        let key = self.current_key(user);
        let token = match self.cache.get(&key).await {
            Lookup::Hit(order) => return Ok(order),
            Lookup::Miss(token) => token,
        };

        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order_by_user_and_status(user, OrderStatus::Open)
            .await?
            .ok_or_else(|| DomainError::not_found("Open order of user", user))?;
        tx.commit().await?;

        self.cache.fill(key, &order, token).await?;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_orders_by_user(
        &self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Page<Order>> {
        let mut tx = self.store.begin().await?;
        let page = tx.page_orders_by_user(user, request).await?;
        tx.commit().await?;
        Ok(page)
    }

    /// Cancels an order. Cancelling a cancelled order is a no-op; a completed
    /// order cannot be cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .find_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", id))?;

        match order.status {
            OrderStatus::Cancel => return Ok(order),
            OrderStatus::Complete => {
                return Err(DomainError::bad_request(format!(
                    "Order ({id}) is complete and cannot be cancelled"
                )));
            }
            OrderStatus::Open => {}
        }

        order.status = OrderStatus::Cancel;
        let order = tx.update_order(&order).await?;
        tx.commit().await?;

        self.cache
            .evict_all(&[self.id_key(id), self.current_key(order.user)])
            .await;
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::debug!(order_id = %id, "Order cancelled");
        Ok(order)
    }

    /// Removes an order record; a missing one is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let Some(order) = tx.find_order(id).await? else {
            return Ok(());
        };
        tx.delete_order(id).await?;
        tx.commit().await?;

        self.cache
            .evict_all(&[self.id_key(id), self.current_key(order.user)])
            .await;
        tracing::debug!(order_id = %id, "Order deleted");
        Ok(())
    }
}
