//! Domain layer of the shop backend.
//!
//! This crate provides the services behind every use case:
//! - catalog services for users, categories, products and comments
//! - [`CartService`] for building carts and computing their totals
//! - [`OrderService`] for the order lifecycle, priced by a [`DiscountEngine`]
//!
//! Each service method runs in its own store transaction and evicts the
//! cache keys of every entity it changed once the transaction has committed.

pub mod cart;
pub mod category;
pub mod comment;
pub mod discount;
mod edit;
pub mod error;
pub mod locks;
pub mod lookup;
pub mod order;
pub mod product;
pub mod shop;
pub mod user;

pub use cart::{CartService, MAX_QUANTITY, calculate_total, line_total};
pub use category::{CategoryEdit, CategoryService};
pub use comment::{CommentService, NewCommentRequest};
pub use discount::{DiscountEngine, FlatDiscount, NoDiscount};
pub use error::{DomainError, Result};
pub use locks::UserLocks;
pub use lookup::Lookups;
pub use order::OrderService;
pub use product::{NewProductRequest, ProductEdit, ProductService};
pub use shop::Shop;
pub use user::{NewUserRequest, UserEdit, UserService};
