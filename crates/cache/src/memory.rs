//! In-memory entity cache.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{CacheConfig, CacheKey, EntityCache, FillToken};

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// Eviction stamps kept before they are collapsed into the floor.
const MAX_EVICTION_STAMPS: usize = 4096;

#[derive(Debug, Default)]
struct State {
    entries: HashMap<CacheKey, Entry>,
    /// Generation of the latest eviction of each key.
    evicted: HashMap<CacheKey, u64>,
    generation: u64,
    /// Fills holding a token older than this are refused. Raised whenever
    /// `evicted` is cleared, since the cleared stamps can no longer be checked.
    floor: u64,
}

impl State {
    fn evict(&mut self, key: &CacheKey) {
        self.generation += 1;
        self.entries.remove(key);
        if self.evicted.len() >= MAX_EVICTION_STAMPS {
            self.evicted.clear();
            self.floor = self.generation;
        }
        self.evicted.insert(key.clone(), self.generation);
    }

    fn accepts(&self, key: &CacheKey, token: FillToken) -> bool {
        token.generation() >= self.floor
            && self
                .evicted
                .get(key)
                .is_none_or(|&evicted| evicted <= token.generation())
    }
}

/// Process-local cache backed by a `HashMap`.
///
/// Concurrent misses for the same key are not coalesced; each caller reads
/// the store and fills the key unless a write evicted it in the meantime.
#[derive(Clone, Default)]
pub struct InMemoryEntityCache {
    state: Arc<RwLock<State>>,
    config: CacheConfig,
}

impl InMemoryEntityCache {
    /// Creates a new empty cache with no expiry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            state: Arc::default(),
            config,
        }
    }

    /// Returns true if a live entry exists for the key.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        let now = Utc::now();
        self.state
            .read()
            .await
            .entries
            .get(key)
            .is_some_and(|e| !e.is_expired(now))
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Clears all entries (useful for testing). Fills started before the
    /// call are refused.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.evicted.clear();
        state.generation += 1;
        state.floor = state.generation;
    }

    fn entry(&self, value: Value) -> Entry {
        Entry {
            value,
            expires: self.config.ttl.map(|ttl| Utc::now() + ttl),
        }
    }
}

#[async_trait]
impl EntityCache for InMemoryEntityCache {
    async fn get(&self, key: &CacheKey) -> Option<Value> {
        let now = Utc::now();
        {
            let state = self.state.read().await;
            match state.entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut state = self.state.write().await;
        if state.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            state.entries.remove(key);
        }
        None
    }

    async fn put(&self, key: CacheKey, value: Value) {
        let entry = self.entry(value);
        self.state.write().await.entries.insert(key, entry);
    }

    async fn fill_token(&self, _key: &CacheKey) -> FillToken {
        FillToken::new(self.state.read().await.generation)
    }

    async fn fill(&self, key: CacheKey, value: Value, token: FillToken) -> bool {
        let entry = self.entry(value);
        let mut state = self.state.write().await;
        if !state.accepts(&key, token) {
            return false;
        }
        state.entries.insert(key, entry);
        true
    }

    async fn evict(&self, key: &CacheKey) {
        self.state.write().await.evict(key);
    }

    async fn evict_all(&self, keys: &[CacheKey]) {
        let mut state = self.state.write().await;
        for key in keys {
            state.evict(key);
        }
    }
}
