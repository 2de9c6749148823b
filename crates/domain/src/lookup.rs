//! Status-filtered lookups shared by the services.
//!
//! These run inside the caller's transaction, so a service can resolve the
//! entities it references without opening a second one.

use async_trait::async_trait;
use common::{Category, CategoryId, Product, ProductId, ProductStatus, User, UserId, UserStatus};
use store::Transaction;

use crate::{DomainError, Result};

/// Lookups that fail with [`DomainError::NotFound`] instead of returning `None`.
#[async_trait]
pub trait Lookups: Transaction {
    /// Resolves an ACTIVE or PENDING user.
    async fn user_by_id(&mut self, id: UserId) -> Result<User> {
        self.find_user_with_status(id, &UserStatus::VISIBLE)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    /// Resolves an ACTIVE or PENDING user by username and password.
    ///
    /// A failed match is a bad request rather than a missing resource.
    async fn user_by_credentials(&mut self, username: &str, password: &str) -> Result<User> {
        self.find_user_by_credentials(username, password, &UserStatus::VISIBLE)
            .await?
            .ok_or_else(|| {
                DomainError::bad_request(format!("The username ({username}) not found."))
            })
    }

    /// Resolves an AVAILABLE product.
    async fn product_by_id(&mut self, id: ProductId) -> Result<Product> {
        self.find_product_with_status(id, &ProductStatus::VISIBLE)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    async fn category_by_id(&mut self, id: CategoryId) -> Result<Category> {
        self.find_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", id))
    }
}

// Blanket implementation for all transactions
impl<T: Transaction + ?Sized> Lookups for T {}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use common::{Authority, NewUser};
    use store::{InMemoryStore, Store};

    use super::*;

    fn new_user(status: UserStatus) -> NewUser {
        NewUser {
            username: "alice".to_string(),
            password: "secret".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            family: "Liddell".to_string(),
            status,
            authorities: BTreeSet::from([Authority::User]),
        }
    }

    #[tokio::test]
    async fn hidden_user_is_not_found() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(new_user(UserStatus::Frozen)).await.unwrap();

        let err = tx.user_by_id(user.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "User", .. }));
    }

    #[tokio::test]
    async fn wrong_password_is_a_bad_request() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(new_user(UserStatus::Active)).await.unwrap();

        assert!(tx.user_by_credentials("alice", "secret").await.is_ok());
        let err = tx.user_by_credentials("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, DomainError::BadRequest(_)));
    }

    #[tokio::test]
    async fn missing_category_is_not_found() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx.category_by_id(CategoryId::new(5)).await.unwrap_err();
        assert_eq!(err.to_string(), "Category (5) not found");
    }
}
