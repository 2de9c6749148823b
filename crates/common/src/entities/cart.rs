use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CartId, ProductId, ProductType, UserId};

string_enum!(
    /// Cart lifecycle: filled while OPEN, ORDERED once an order was taken from it.
    CartStatus, "cart status" {
        Open => "OPEN",
        Ordered => "ORDERED",
        Closed => "CLOSED",
    }
);

impl CartStatus {
    /// Statuses in which a cart is the user's current cart.
    pub const ACTIVE: [CartStatus; 1] = [CartStatus::Open];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

/// One product line in a cart.
///
/// Price and type are snapshots taken when the product was added. The line
/// total is derived on every read and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductId,
    pub product_type: ProductType,
    pub quantity: u32,
    pub price: Decimal,
}

impl LineItem {
    pub fn new(product: ProductId, product_type: ProductType, quantity: u32, price: Decimal) -> Self {
        Self {
            product,
            product_type,
            quantity,
            price,
        }
    }

    /// Unit price times quantity, `None` when it does not fit a `Decimal`.
    pub fn total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// A user's cart and its line items, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user: UserId,
    pub status: CartStatus,
    pub items: Vec<LineItem>,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

impl Cart {
    pub fn item(&self, product: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.product == product)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCart {
    pub user: UserId,
    pub status: CartStatus,
    pub items: Vec<LineItem>,
}
