//! Persistence port for the shop backend.
//!
//! Services talk to the store only through a [`Transaction`] obtained from
//! [`Store::begin`]. A transaction that is dropped without [`Transaction::commit`]
//! is rolled back, so every exit path of a service method leaves the store
//! either fully updated or untouched.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{ONE_OPEN_ORDER_PER_USER, Result, StoreError, UNIQUE_LIVE_USERNAME};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    CartRepository, CategoryRepository, CommentRepository, OrderRepository, ProductRepository,
    Store, Transaction, UserRepository,
};
