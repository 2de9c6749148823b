use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{CartId, OrderId, PRICE_SCALE, UserId};

string_enum!(
    /// Order lifecycle.
    ///
    /// A user has at most one OPEN order; creating a new one cancels it.
    OrderStatus, "order status" {
        Open => "OPEN",
        Cancel => "CANCEL",
        Complete => "COMPLETE",
    }
);

string_enum!(
    /// How a discount rate is applied to an order price.
    DiscountType, "discount type" {
        /// `rate` is a fraction of the price (0.10 = 10% off).
        Percentage => "PERCENTAGE",
        /// `rate` is a flat amount taken off the price.
        Price => "PRICE",
        /// No discount applies.
        Unknown => "UNKNOWN",
    }
);

/// A discount attached to an order when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub rate: Decimal,
    pub discount_type: DiscountType,
}

impl Discount {
    pub fn new(rate: Decimal, discount_type: DiscountType) -> Self {
        Self {
            rate,
            discount_type,
        }
    }

    /// The empty discount.
    pub fn none() -> Self {
        Self::new(Decimal::ZERO, DiscountType::Unknown)
    }

    /// Amount taken off `price`, never more than the price itself.
    pub fn reduction(&self, price: Decimal) -> Decimal {
        let reduction = match self.discount_type {
            DiscountType::Percentage => price.checked_mul(self.rate).unwrap_or(
                if self.rate.is_sign_negative() {
                    Decimal::ZERO
                } else {
                    price
                },
            ),
            DiscountType::Price => self.rate,
            DiscountType::Unknown => Decimal::ZERO,
        };
        reduction.clamp(Decimal::ZERO, price.max(Decimal::ZERO))
    }

    /// Price after the discount.
    pub fn apply_to(&self, price: Decimal) -> Decimal {
        price - self.reduction(price)
    }
}

impl Default for Discount {
    fn default() -> Self {
        Self::none()
    }
}

/// A persisted order.
///
/// `price` is the cart value when the order was taken, `total` the price
/// after `discount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user: UserId,
    pub cart: CartId,
    pub price: Decimal,
    pub discount: Discount,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user: UserId,
    pub cart: CartId,
    pub price: Decimal,
    pub discount: Discount,
    pub total: Decimal,
    pub status: OrderStatus,
}

impl NewOrder {
    /// An OPEN order for a cart worth `price`.
    ///
    /// The total is rounded to [`PRICE_SCALE`] places, half away from zero,
    /// the way the database stores it.
    pub fn open(user: UserId, cart: CartId, price: Decimal, discount: Discount) -> Self {
        let total = discount
            .apply_to(price)
            .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
        Self {
            user,
            cart,
            price,
            discount,
            total,
            status: OrderStatus::Open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn no_discount_keeps_price() {
        assert_eq!(Discount::none().apply_to(dec!(200.00)), dec!(200.00));
    }

    #[test]
    fn percentage_discount_takes_a_fraction() {
        let discount = Discount::new(dec!(0.10), DiscountType::Percentage);
        assert_eq!(discount.apply_to(dec!(200.00)), dec!(180.00));
    }

    #[test]
    fn price_discount_takes_a_flat_amount() {
        let discount = Discount::new(dec!(15), DiscountType::Price);
        assert_eq!(discount.apply_to(dec!(200.00)), dec!(185.00));
    }

    #[test]
    fn discount_never_makes_total_negative() {
        let discount = Discount::new(dec!(500), DiscountType::Price);
        assert_eq!(discount.apply_to(dec!(200.00)), Decimal::ZERO);
    }

    #[test]
    fn huge_percentage_saturates_at_price() {
        let discount = Discount::new(Decimal::MAX, DiscountType::Percentage);
        assert_eq!(discount.apply_to(Decimal::MAX), Decimal::ZERO);
        let discount = Discount::new(Decimal::MIN, DiscountType::Percentage);
        assert_eq!(discount.apply_to(Decimal::MAX), Decimal::MAX);
    }

    #[test]
    fn open_order_total_is_rounded_to_price_scale() {
        let order = NewOrder::open(
            UserId::new(1),
            CartId::new(2),
            dec!(0.00015),
            Discount::none(),
        );
        assert_eq!(order.total, dec!(0.0002));
        assert_eq!(order.price, dec!(0.00015));
    }

    #[test]
    fn unknown_type_ignores_rate() {
        let discount = Discount::new(dec!(0.5), DiscountType::Unknown);
        assert_eq!(discount.apply_to(dec!(10)), dec!(10));
    }

    #[test]
    fn new_open_order_computes_total() {
        let order = NewOrder::open(
            UserId::new(1),
            CartId::new(2),
            dec!(100),
            Discount::new(dec!(0.25), DiscountType::Percentage),
        );
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.total, dec!(75.00));
    }
}
