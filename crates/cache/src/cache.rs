//! Core cache trait and its typed extension.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{CacheKey, Result};

/// Eviction generation observed when a read-through fill started.
///
/// A fill presenting a token is refused if its key was evicted after the
/// token was taken, so a value read before a write cannot land after the
/// write's eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FillToken(u64);

impl FillToken {
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub const fn generation(&self) -> u64 {
        self.0
    }
}

/// A keyed cache of serialized entities.
///
/// The cache is a derived view of the store and never the source of truth.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EntityCache: Send + Sync {
    /// Returns the cached value, or `None` on a miss.
    async fn get(&self, key: &CacheKey) -> Option<Value>;

    /// Stores a value, replacing any previous entry.
    async fn put(&self, key: CacheKey, value: Value);

    /// Returns the token a read-through fill of `key` must present.
    ///
    /// Take it before reading the store.
    async fn fill_token(&self, key: &CacheKey) -> FillToken;

    /// Stores a value read from the store, unless `key` was evicted after
    /// `token` was taken. Returns true if the value was stored.
    async fn fill(&self, key: CacheKey, value: Value, token: FillToken) -> bool;

    /// Removes a single entry. Evicting a missing key is a no-op.
    async fn evict(&self, key: &CacheKey);

    /// Removes every listed entry.
    async fn evict_all(&self, keys: &[CacheKey]) {
        for key in keys {
            self.evict(key).await;
        }
    }
}

/// Extension trait providing typed access to entity caches.
#[async_trait]
pub trait EntityCacheExt: EntityCache {
    /// Reads and decodes an entry.
    ///
    /// An entry that no longer decodes as `T` is evicted and reported as a miss.
    async fn get_as<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Dropping undecodable cache entry");
                self.evict(key).await;
                None
            }
        }
    }

    /// Encodes and stores an entry.
    async fn put_as<T>(&self, key: CacheKey, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        self.put(key, value).await;
        Ok(())
    }

    /// Encodes and conditionally stores an entry, see [`EntityCache::fill`].
    async fn fill_as<T>(&self, key: CacheKey, value: &T, token: FillToken) -> Result<bool>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        Ok(self.fill(key, value, token).await)
    }
}

// Blanket implementation for all EntityCache implementations
impl<T: EntityCache + ?Sized> EntityCacheExt for T {}
