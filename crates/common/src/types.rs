use serde::{Deserialize, Serialize};

/// Declares a store-assigned identifier.
///
/// Each identifier wraps the `i64` identity produced by the store so that a
/// product id can never be passed where a user id is expected.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw store identity.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw store identity.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identity of a user account.
    UserId
);
entity_id!(
    /// Identity of a product category.
    CategoryId
);
entity_id!(
    /// Identity of a catalog product.
    ProductId
);
entity_id!(
    /// Identity of a product comment.
    CommentId
);
entity_id!(
    /// Identity of a shopping cart.
    CartId
);
entity_id!(
    /// Identity of an order.
    OrderId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_preserves_raw_value() {
        let id = ProductId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(ProductId::from(42), id);
    }

    #[test]
    fn id_displays_raw_value() {
        assert_eq!(UserId::new(7).to_string(), "7");
    }

    #[test]
    fn id_serializes_transparently() {
        let json = serde_json::to_string(&OrderId::new(9)).unwrap();
        assert_eq!(json, "9");
        let id: OrderId = serde_json::from_str("9").unwrap();
        assert_eq!(id, OrderId::new(9));
    }
}
