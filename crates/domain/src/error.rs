//! Domain error types.

use std::fmt;

use cache::CacheError;
use common::{InvalidPageRequest, ParseEnumError};
use store::{ONE_OPEN_ORDER_PER_USER, StoreError, UNIQUE_LIVE_USERNAME};
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The entity does not exist or is hidden by a status filter.
    #[error("{entity} ({key}) not found")]
    NotFound { entity: &'static str, key: String },

    /// The request cannot be served as given.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A concurrent request won a race; the caller may retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// An error occurred in the cache.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl DomainError {
    pub fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        DomainError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        DomainError::BadRequest(message.into())
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        if e.violates(ONE_OPEN_ORDER_PER_USER) {
            DomainError::Conflict("the user already has an open order".to_string())
        } else if e.violates(UNIQUE_LIVE_USERNAME) {
            DomainError::BadRequest("username is already taken".to_string())
        } else {
            DomainError::Store(e)
        }
    }
}

impl From<InvalidPageRequest> for DomainError {
    fn from(e: InvalidPageRequest) -> Self {
        DomainError::BadRequest(e.to_string())
    }
}

impl From<ParseEnumError> for DomainError {
    fn from(e: ParseEnumError) -> Self {
        DomainError::BadRequest(e.to_string())
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_order_race_is_a_conflict() {
        let err = DomainError::from(StoreError::unique(ONE_OPEN_ORDER_PER_USER));
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn duplicate_username_is_a_bad_request() {
        let err = DomainError::from(StoreError::unique(UNIQUE_LIVE_USERNAME));
        assert!(matches!(err, DomainError::BadRequest(_)));
    }

    #[test]
    fn other_store_errors_pass_through() {
        let err = DomainError::from(StoreError::Decode("bad".to_string()));
        assert!(matches!(err, DomainError::Store(_)));
    }

    #[test]
    fn not_found_names_entity_and_key() {
        let err = DomainError::not_found("Product", 42);
        assert_eq!(err.to_string(), "Product (42) not found");
    }
}
