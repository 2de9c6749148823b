//! Entity records as they are persisted by the store.

/// Declares a status/kind enum with a stable upper-case wire form.
///
/// The same string is used for JSON, for the database column and for
/// parsing caller input, so an unknown value is rejected in one place.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the stored form of this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(crate::error::ParseEnumError::new($kind, s)),
                }
            }
        }
    };
}

mod cart;
mod category;
mod comment;
mod order;
mod product;
mod user;

pub use cart::{Cart, CartStatus, LineItem, NewCart};
pub use category::{Category, NewCategory};
pub use comment::{Comment, CommentStatus, NewComment, Rate};
pub use order::{Discount, DiscountType, NewOrder, Order, OrderStatus};
pub use product::{NewProduct, PRICE_SCALE, Product, ProductStatus, ProductType, max_price};
pub use user::{Authority, NewUser, User, UserStatus};
