use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

string_enum!(
    /// Account lifecycle.
    ///
    /// ```text
    /// PENDING ──► ACTIVE ◄──► FROZEN
    ///    │           │           │
    ///    └───────────┴───────────┴──► BANNED | DELETED (terminal)
    /// ```
    UserStatus, "user status" {
        /// Self-registered, not yet confirmed.
        Pending => "PENDING",
        Active => "ACTIVE",
        Banned => "BANNED",
        /// Temporarily suspended; can be re-activated.
        Frozen => "FROZEN",
        /// Closed by the owner; the record is kept.
        Deleted => "DELETED",
    }
);

impl UserStatus {
    /// Statuses visible to ordinary lookups.
    pub const VISIBLE: [UserStatus; 2] = [UserStatus::Active, UserStatus::Pending];

    /// Returns true if ordinary lookups may return a user in this status.
    pub fn is_visible(&self) -> bool {
        Self::VISIBLE.contains(self)
    }

    /// Returns true if no further status change is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UserStatus::Banned | UserStatus::Deleted)
    }

    /// Returns true if an account may move from this status to `next`.
    ///
    /// Re-applying the current status is always allowed.
    pub fn can_transition_to(&self, next: UserStatus) -> bool {
        *self == next || !self.is_terminal()
    }
}

string_enum!(
    /// Authority tags granted to an account.
    Authority, "authority" {
        User => "USER",
        Admin => "ADMIN",
    }
);

/// A persisted user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password: String,
    pub email: String,
    pub name: String,
    pub family: String,
    pub status: UserStatus,
    pub authorities: BTreeSet<Authority>,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.authorities.contains(&Authority::Admin)
    }
}

/// A user account that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub name: String,
    pub family: String,
    pub status: UserStatus,
    pub authorities: BTreeSet<Authority>,
}
