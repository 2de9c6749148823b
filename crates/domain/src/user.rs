//! User accounts.

use std::collections::BTreeSet;
use std::sync::Arc;

use cache::{CacheKey, EntityCache, KindCache, Lookup};
use common::{Authority, NewUser, Page, PageRequest, User, UserId, UserStatus};
use serde::Deserialize;
use store::Store;

use crate::edit::non_blank;
use crate::lookup::Lookups;
use crate::{DomainError, Result};

/// Registration data for a new account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUserRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub name: String,
    pub family: String,
    /// Only honoured when an admin creates the account.
    #[serde(default)]
    pub authorities: BTreeSet<Authority>,
}

/// Partial update of an account. Blank strings leave the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEdit {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub family: Option<String>,
    /// Admin only.
    pub status: Option<UserStatus>,
    /// Admin only.
    pub authorities: Option<BTreeSet<Authority>>,
}

/// Service for managing user accounts.
///
/// Cached under `user:byId/<id>`, `user:byUsername/<username>` and
/// `user:byEmail/<email>`; every write evicts all three.
pub struct UserService<S: Store> {
    store: S,
    cache: KindCache,
}

impl<S: Store> UserService<S> {
    pub fn new(store: S, cache: Arc<dyn EntityCache>) -> Self {
        Self {
            store,
            cache: KindCache::new("user", cache),
        }
    }

    fn keys(&self, user: &User) -> Vec<CacheKey> {
        vec![
            self.cache.key("byId", user.id),
            self.cache.key("byUsername", &user.username),
            self.cache.key("byEmail", &user.email),
        ]
    }

    /// Registers an account.
    ///
    /// Admin-created accounts start ACTIVE with the requested authorities;
    /// self-registered ones start PENDING with `USER` only.
    #[tracing::instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(&self, request: NewUserRequest, is_admin: bool) -> Result<User> {
        let mut tx = self.store.begin().await?;

        if tx
            .find_user_by_username(&request.username, &UserStatus::VISIBLE)
            .await?
            .is_some()
        {
            return Err(DomainError::bad_request(
                "Your username created before, you can try to login",
            ));
        }

        let (status, authorities) = if is_admin && !request.authorities.is_empty() {
            (UserStatus::Active, request.authorities)
        } else if is_admin {
            (UserStatus::Active, BTreeSet::from([Authority::User]))
        } else {
            (UserStatus::Pending, BTreeSet::from([Authority::User]))
        };

        let user = tx
            .insert_user(NewUser {
                username: request.username,
                password: request.password,
                email: request.email,
                name: request.name,
                family: request.family,
                status,
                authorities,
            })
            .await?;
        tx.commit().await?;

        self.cache.evict_all(&self.keys(&user)).await;
        tracing::debug!(user_id = %user.id, status = %user.status, "User saved");
        Ok(user)
    }

    /// Applies a partial update. Status and authorities change only for admins.
    #[tracing::instrument(skip(self, edit))]
    pub async fn edit_user(&self, id: UserId, edit: UserEdit, is_admin: bool) -> Result<User> {
        let mut tx = self.store.begin().await?;
        let mut user = tx
            .find_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))?;
        let mut stale = self.keys(&user);

        if let Some(username) = non_blank(edit.username) {
            user.username = username;
        }
        if let Some(email) = non_blank(edit.email) {
            user.email = email.to_lowercase();
        }
        if let Some(name) = non_blank(edit.name) {
            user.name = name;
        }
        if let Some(family) = non_blank(edit.family) {
            user.family = family;
        }
        if is_admin {
            if let Some(status) = edit.status {
                check_transition(&user, status)?;
                user.status = status;
            }
            if let Some(authorities) = edit.authorities.filter(|a| !a.is_empty()) {
                user.authorities = authorities;
            }
        }

        let user = tx.update_user(&user).await?;
        tx.commit().await?;

        stale.extend(self.keys(&user));
        self.cache.evict_all(&stale).await;
        tracing::debug!(user_id = %user.id, "User edited");
        Ok(user)
    }

    /// Loads an ACTIVE or PENDING user.
    #[tracing::instrument(skip(self))]
    pub async fn load_user(&self, id: UserId) -> Result<User> {
        let key = self.cache.key("byId", id);
        let token = match self.cache.get(&key).await {
            Lookup::Hit(user) => return Ok(user),
            Lookup::Miss(token) => token,
        };

        let mut tx = self.store.begin().await?;
        let user = tx.user_by_id(id).await?;
        tx.commit().await?;

        self.cache.fill(key, &user, token).await?;
        Ok(user)
    }

    /// Loads an ACTIVE or PENDING user by username.
    #[tracing::instrument(skip(self))]
    pub async fn load_by_username(&self, username: &str) -> Result<User> {
        let key = self.cache.key("byUsername", username);
        let token = match self.cache.get(&key).await {
            Lookup::Hit(user) => return Ok(user),
            Lookup::Miss(token) => token,
        };

        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user_by_username(username, &UserStatus::VISIBLE)
            .await?
            .ok_or_else(|| DomainError::not_found("Username", username))?;
        tx.commit().await?;

        self.cache.fill(key, &user, token).await?;
        Ok(user)
    }

    /// Lists ACTIVE and PENDING users.
    #[tracing::instrument(skip(self))]
    pub async fn load_users(&self, request: PageRequest) -> Result<Page<User>> {
        let mut tx = self.store.begin().await?;
        let page = tx.page_users(&UserStatus::VISIBLE, request).await?;
        tx.commit().await?;
        Ok(page)
    }

    /// Checks credentials against ACTIVE and PENDING accounts.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let mut tx = self.store.begin().await?;
        let user = tx.user_by_credentials(username, password).await?;
        tx.commit().await?;
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn ban_user(&self, id: UserId) -> Result<User> {
        self.change_status(id, UserStatus::Banned).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn freeze_user(&self, id: UserId) -> Result<User> {
        self.change_status(id, UserStatus::Frozen).await
    }

    /// Marks the account DELETED, keeping the record.
    ///
    /// Repeating the call is allowed while the record exists.
    #[tracing::instrument(skip(self))]
    pub async fn safe_delete_user(&self, id: UserId) -> Result<User> {
        self.change_status(id, UserStatus::Deleted).await
    }

    /// Removes the account record. Admin only; a missing user is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let Some(user) = tx.find_user(id).await? else {
            return Ok(());
        };
        tx.delete_user(id).await?;
        tx.commit().await?;

        self.cache.evict_all(&self.keys(&user)).await;
        tracing::debug!(user_id = %id, "User deleted");
        Ok(())
    }

    async fn change_status(&self, id: UserId, status: UserStatus) -> Result<User> {
        let mut tx = self.store.begin().await?;
        let mut user = tx
            .find_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))?;
        check_transition(&user, status)?;

        let from = user.status;
        user.status = status;
        let user = tx.update_user(&user).await?;
        tx.commit().await?;

        self.cache.evict_all(&self.keys(&user)).await;
        tracing::debug!(user_id = %id, %from, to = %status, "User status changed");
        Ok(user)
    }
}

fn check_transition(user: &User, next: UserStatus) -> Result<()> {
    if user.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(DomainError::bad_request(format!(
            "User ({}) is {} and cannot become {}",
            user.id, user.status, next
        )))
    }
}
