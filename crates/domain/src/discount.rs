//! Promotion policies applied when an order is created.

use common::{Cart, Discount};

/// Decides the discount granted for a cart.
///
/// Policies are stateless and side-effect free.
pub trait DiscountEngine: Send + Sync {
    fn apply_promotion(&self, cart: &Cart) -> Discount;
}

/// Grants nothing: rate 0, type UNKNOWN.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscount;

impl DiscountEngine for NoDiscount {
    fn apply_promotion(&self, _cart: &Cart) -> Discount {
        Discount::none()
    }
}

/// Grants the same discount to every cart.
#[derive(Debug, Clone, Copy)]
pub struct FlatDiscount(pub Discount);

impl DiscountEngine for FlatDiscount {
    fn apply_promotion(&self, _cart: &Cart) -> Discount {
        self.0
    }
}
