//! Owner-scoped cache handle.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use crate::{CacheKey, EntityCache, EntityCacheExt, FillToken, Result};

/// Outcome of a [`KindCache::get`].
#[derive(Debug)]
pub enum Lookup<T> {
    Hit(T),
    /// Not cached; fill with this token after reading the store.
    Miss(FillToken),
}

impl<T> Lookup<T> {
    pub fn hit(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss(_) => None,
        }
    }
}

/// A view of the shared cache restricted to one entity kind.
///
/// Each service holds the handle for the kind it owns, so only that service
/// builds, fills and evicts keys of its kind. Hits, misses and evictions are
/// counted per kind.
#[derive(Clone)]
pub struct KindCache {
    kind: &'static str,
    cache: Arc<dyn EntityCache>,
}

impl KindCache {
    pub fn new(kind: &'static str, cache: Arc<dyn EntityCache>) -> Self {
        Self { kind, cache }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Builds a key of this handle's kind.
    pub fn key(&self, dimension: &str, value: impl fmt::Display) -> CacheKey {
        CacheKey::new(self.kind, dimension, value)
    }

    /// Reads an entry, recording a hit or a miss.
    ///
    /// A miss carries the token for filling the key once the value has been
    /// read from the store.
    pub async fn get<T>(&self, key: &CacheKey) -> Lookup<T>
    where
        T: DeserializeOwned + Send,
    {
        debug_assert_eq!(key.kind(), self.kind);
        if let Some(value) = self.cache.get_as::<T>(key).await {
            metrics::counter!("cache_hits_total", "kind" => self.kind).increment(1);
            tracing::trace!(key = %key, "Cache hit");
            return Lookup::Hit(value);
        }
        metrics::counter!("cache_misses_total", "kind" => self.kind).increment(1);
        tracing::trace!(key = %key, "Cache miss");
        Lookup::Miss(self.cache.fill_token(key).await)
    }

    /// Fills a missed key, unless a write evicted it since the miss.
    pub async fn fill<T>(&self, key: CacheKey, value: &T, token: FillToken) -> Result<()>
    where
        T: Serialize + Sync,
    {
        debug_assert_eq!(key.kind(), self.kind);
        if !self.cache.fill_as(key.clone(), value, token).await? {
            metrics::counter!("cache_fills_skipped_total", "kind" => self.kind).increment(1);
            tracing::debug!(key = %key, "Skipped fill of a key evicted after the miss");
        }
        Ok(())
    }

    /// Evicts every listed key.
    pub async fn evict_all(&self, keys: &[CacheKey]) {
        debug_assert!(keys.iter().all(|k| k.kind() == self.kind));
        self.cache.evict_all(keys).await;
        metrics::counter!("cache_evictions_total", "kind" => self.kind)
            .increment(keys.len() as u64);
        tracing::debug!(kind = self.kind, count = keys.len(), "Evicted cache entries");
    }
}

impl fmt::Debug for KindCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindCache").field("kind", &self.kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryEntityCache;

    #[tokio::test]
    async fn keys_carry_the_handle_kind() {
        let cache = KindCache::new("category", Arc::new(InMemoryEntityCache::new()));
        let key = cache.key("byName", "electronics");
        assert_eq!(key.as_str(), "category:byName/electronics");
    }

    async fn fill<T: Serialize + Sync>(cache: &KindCache, key: CacheKey, value: &T) {
        let Lookup::Miss(token) = cache.get::<serde_json::Value>(&key).await else {
            panic!("expected a miss for {key}");
        };
        cache.fill(key, value, token).await.unwrap();
    }

    #[tokio::test]
    async fn miss_fill_then_evict_all() {
        let shared = Arc::new(InMemoryEntityCache::new());
        let cache = KindCache::new("user", shared.clone());
        let keys = vec![cache.key("byId", 1), cache.key("byUsername", "alice")];

        fill(&cache, keys[1].clone(), &"alice").await;
        assert_eq!(cache.get::<String>(&keys[1]).await.hit().as_deref(), Some("alice"));

        cache.evict_all(&keys).await;
        assert!(shared.is_empty().await);
    }

    #[tokio::test]
    async fn fill_racing_an_eviction_is_dropped() {
        let shared = Arc::new(InMemoryEntityCache::new());
        let cache = KindCache::new("order", shared.clone());
        let key = cache.key("currentByUser", 7);

        let Lookup::Miss(token) = cache.get::<u32>(&key).await else {
            panic!("expected a miss");
        };
        cache.evict_all(std::slice::from_ref(&key)).await;
        cache.fill(key.clone(), &5u32, token).await.unwrap();

        assert!(!shared.contains(&key).await);
    }

    #[tokio::test]
    async fn handles_of_different_kinds_share_storage() {
        let shared: Arc<dyn EntityCache> = Arc::new(InMemoryEntityCache::new());
        let users = KindCache::new("user", shared.clone());
        let orders = KindCache::new("order", shared);

        fill(&users, users.key("byId", 1), &"alice").await;
        fill(&orders, orders.key("byId", 1), &10u32).await;

        assert_eq!(
            users.get::<String>(&users.key("byId", 1)).await.hit().as_deref(),
            Some("alice")
        );
        assert_eq!(orders.get::<u32>(&orders.key("byId", 1)).await.hit(), Some(10));
    }
}
