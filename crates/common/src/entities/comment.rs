use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CommentId, ProductId, UserId};

string_enum!(
    /// Moderation state of a comment.
    CommentStatus, "comment status" {
        Submit => "SUBMIT",
        Approve => "APPROVE",
        Reject => "REJECT",
    }
);

string_enum!(
    /// Star rating attached to a comment.
    Rate, "rate" {
        One => "ONE",
        Two => "TWO",
        Three => "THREE",
        Four => "FOUR",
        Five => "FIVE",
        /// No rating given.
        Nan => "NAN",
    }
);

impl Default for Rate {
    fn default() -> Self {
        Rate::Nan
    }
}

/// A user's comment on a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub user: UserId,
    pub product: ProductId,
    pub text: String,
    pub rate: Rate,
    pub status: CommentStatus,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub user: UserId,
    pub product: ProductId,
    pub text: String,
    pub rate: Rate,
    pub status: CommentStatus,
}
