//! Shared types for the shop backend.
//!
//! Every crate in the workspace speaks in terms of these records:
//! - typed identifiers ([`UserId`], [`ProductId`], ...)
//! - entity records and their status enums
//! - pagination ([`PageRequest`], [`Page`])

pub mod entities;
pub mod error;
pub mod page;
pub mod types;

pub use entities::*;
pub use error::ParseEnumError;
pub use page::{InvalidPageRequest, MAX_PAGE_SIZE, Page, PageRequest};
pub use rust_decimal::Decimal;
pub use types::{CartId, CategoryId, CommentId, OrderId, ProductId, UserId};
