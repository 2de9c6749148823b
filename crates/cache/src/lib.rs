//! Read-through entity cache for the shop services.
//!
//! This crate provides the cached read side of every service:
//! - [`CacheKey`] composite keys of the form `<kind>:<dimension>/<value>`
//! - [`EntityCache`] trait for a keyed JSON value cache
//! - [`EntityCacheExt`] typed get/put on top of any cache
//! - [`FillToken`] guard that keeps a late read-through fill from undoing an eviction
//! - [`KindCache`] handle that only reads and writes keys of a single kind
//! - [`InMemoryEntityCache`] process-local implementation with optional TTL

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod kind;
pub mod memory;

pub use cache::{EntityCache, EntityCacheExt, FillToken};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use key::CacheKey;
pub use kind::{KindCache, Lookup};
pub use memory::InMemoryEntityCache;
