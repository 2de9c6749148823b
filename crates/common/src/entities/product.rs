use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CategoryId, ProductId};

string_enum!(
    /// Whether a product is sold on its own or alongside a main product.
    ProductType, "product type" {
        Main => "MAIN",
        Side => "SIDE",
    }
);

string_enum!(
    ProductStatus, "product status" {
        /// In stock; the only status visible to ordering.
        Available => "AVAILABLE",
        Discontinue => "DISCONTINUE",
        /// Out of stock.
        Pending => "PENDING",
        Banned => "BANNED",
    }
);

impl ProductStatus {
    /// Statuses visible to catalog lookups and ordering.
    pub const VISIBLE: [ProductStatus; 1] = [ProductStatus::Available];

    pub fn is_visible(&self) -> bool {
        Self::VISIBLE.contains(self)
    }
}

/// Fraction digits kept for prices and order amounts.
pub const PRICE_SCALE: u32 = 4;

/// Largest amount a price column holds, `NUMERIC(19, 4)`.
pub fn max_price() -> Decimal {
    Decimal::from_i128_with_scale(9_999_999_999_999_999_999, PRICE_SCALE)
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: CategoryId,
    pub description: String,
    pub price: Decimal,
    pub product_type: ProductType,
    pub status: ProductStatus,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub category: CategoryId,
    pub description: String,
    pub price: Decimal,
    pub product_type: ProductType,
    pub status: ProductStatus,
}
