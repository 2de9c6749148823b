//! Shopping carts and their totals.

use common::{
    Cart, CartId, CartStatus, Decimal, LineItem, NewCart, ProductId, UserId, max_price,
};
use store::{Store, Transaction};

use crate::lookup::Lookups;
use crate::{DomainError, Result};

/// Largest quantity a line item can hold.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// `price × quantity` of one line item.
pub fn line_total(item: &LineItem) -> Result<Decimal> {
    item.total().ok_or_else(|| {
        DomainError::bad_request(format!(
            "Total of product ({}) is out of range",
            item.product
        ))
    })
}

/// Sum of `price × quantity` over the cart's line items; zero for an empty cart.
pub fn calculate_total(cart: &Cart) -> Result<Decimal> {
    items_total(&cart.items)
}

fn items_total(items: &[LineItem]) -> Result<Decimal> {
    items.iter().try_fold(Decimal::ZERO, |sum, item| {
        sum.checked_add(line_total(item)?)
            .ok_or_else(|| DomainError::bad_request("Cart total is out of range"))
    })
}

/// Rejects amounts an order could not store.
pub(crate) fn check_orderable(total: Decimal) -> Result<Decimal> {
    if total > max_price() {
        return Err(DomainError::bad_request(format!(
            "Cart total must not exceed {}",
            max_price()
        )));
    }
    Ok(total)
}

/// Loads a cart inside an open transaction.
pub(crate) async fn load_cart_in(tx: &mut dyn Transaction, id: CartId) -> Result<Cart> {
    tx.find_cart(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Cart", id))
}

/// Loads the user's active cart inside an open transaction.
pub(crate) async fn load_open_cart_in(tx: &mut dyn Transaction, user: UserId) -> Result<Cart> {
    tx.find_cart_by_user(user, &CartStatus::ACTIVE)
        .await?
        .ok_or_else(|| DomainError::not_found("Open cart of user", user))
}

/// Service for building carts from the catalog.
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds `quantity` of a product to the user's active cart.
    ///
    /// The cart is created when the user has none. The product's current price
    /// and type are snapshotted on the line; adding a product that is already
    /// in the cart increases its quantity.
    #[tracing::instrument(skip(self))]
    pub async fn create_or_update_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(DomainError::bad_request("Quantity must be at least 1"));
        }
        if quantity > MAX_QUANTITY {
            return Err(quantity_too_large());
        }

        let mut tx = self.store.begin().await?;
        tx.lock_user(user).await?;
        tx.user_by_id(user).await?;
        let product = tx.product_by_id(product).await?;

        let cart = match tx.find_cart_by_user(user, &CartStatus::ACTIVE).await? {
            Some(mut cart) => {
                match cart.items.iter_mut().find(|i| i.product == product.id) {
                    Some(item) => {
                        item.quantity = item
                            .quantity
                            .checked_add(quantity)
                            .filter(|q| *q <= MAX_QUANTITY)
                            .ok_or_else(quantity_too_large)?;
                        item.price = product.price;
                        item.product_type = product.product_type;
                    }
                    None => cart.items.push(LineItem::new(
                        product.id,
                        product.product_type,
                        quantity,
                        product.price,
                    )),
                }
                check_orderable(items_total(&cart.items)?)?;
                tx.update_cart(&cart).await?
            }
            None => {
                let items = vec![LineItem::new(
                    product.id,
                    product.product_type,
                    quantity,
                    product.price,
                )];
                check_orderable(items_total(&items)?)?;
                tx.insert_cart(NewCart {
                    user,
                    status: CartStatus::Open,
                    items,
                })
                .await?
            }
        };
        tx.commit().await?;

        tracing::debug!(cart_id = %cart.id, items = cart.items.len(), "Cart saved");
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_cart(&self, id: CartId) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        let cart = load_cart_in(tx.as_mut(), id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_open_cart_for_user(&self, user: UserId) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        let cart = load_open_cart_in(tx.as_mut(), user).await?;
        tx.commit().await?;
        Ok(cart)
    }

    pub fn calculate_total(&self, cart: &Cart) -> Result<Decimal> {
        calculate_total(cart)
    }

    /// Deletes a cart and its line items; a missing one is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn delete_cart(&self, id: CartId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        if tx.delete_cart(id).await? {
            tx.commit().await?;
            tracing::debug!(cart_id = %id, "Cart deleted");
        }
        Ok(())
    }
}

fn quantity_too_large() -> DomainError {
    DomainError::bad_request(format!("Quantity must not exceed {MAX_QUANTITY}"))
}
