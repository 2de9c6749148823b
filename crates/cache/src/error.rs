//! Cache error types.

use thiserror::Error;

/// Errors that can occur when writing to the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A value could not be converted to or from its cached form.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
