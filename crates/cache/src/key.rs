//! Composite cache keys.

use std::fmt;

/// A cache key of the form `<kind>:<dimension>/<value>`.
///
/// `kind` names the entity kind (`user`, `product`, ...), `dimension` the
/// index the entry is reachable by (`byId`, `byName`, ...).
///
/// ```
/// use cache::CacheKey;
///
/// let key = CacheKey::new("product", "byId", 42);
/// assert_eq!(key.as_str(), "product:byId/42");
/// assert_eq!(key.kind(), "product");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    kind: &'static str,
    key: String,
}

impl CacheKey {
    pub fn new(kind: &'static str, dimension: &str, value: impl fmt::Display) -> Self {
        Self {
            kind,
            key: format!("{kind}:{dimension}/{value}"),
        }
    }

    /// Returns the entity kind this key belongs to.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
