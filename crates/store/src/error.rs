use thiserror::Error;

/// Partial unique index allowing a single OPEN order per user.
pub const ONE_OPEN_ORDER_PER_USER: &str = "orders_one_open_per_user";

/// Partial unique index on usernames of ACTIVE and PENDING accounts.
pub const UNIQUE_LIVE_USERNAME: &str = "users_username_live";

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write violated a unique constraint.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// An update or delete targeted a row that does not exist.
    #[error("{entity} row not found: {id}")]
    RowNotFound { entity: &'static str, id: i64 },

    /// A stored value could not be mapped back into a record.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn unique(constraint: impl Into<String>) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    /// Returns true if this error is a violation of the named constraint.
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint: c } if c == constraint)
    }
}

impl From<common::ParseEnumError> for StoreError {
    fn from(e: common::ParseEnumError) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
