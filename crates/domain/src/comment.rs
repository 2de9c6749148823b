//! Product comments.

use std::sync::Arc;

use cache::{CacheKey, EntityCache, KindCache, Lookup};
use common::{
    Comment, CommentId, CommentStatus, NewComment, Page, PageRequest, ProductId, Rate, UserId,
};
use serde::Deserialize;
use store::Store;

use crate::edit::non_blank;
use crate::lookup::Lookups;
use crate::{DomainError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct NewCommentRequest {
    pub user: UserId,
    pub product: ProductId,
    pub text: String,
    #[serde(default)]
    pub rate: Rate,
}

/// Service for managing comments, cached by id.
pub struct CommentService<S: Store> {
    store: S,
    cache: KindCache,
}

impl<S: Store> CommentService<S> {
    pub fn new(store: S, cache: Arc<dyn EntityCache>) -> Self {
        Self {
            store,
            cache: KindCache::new("comment", cache),
        }
    }

    fn key(&self, id: CommentId) -> CacheKey {
        self.cache.key("byId", id)
    }

    /// Submits a comment by a visible user on an available product.
    #[tracing::instrument(skip(self, request), fields(user = %request.user, product = %request.product))]
    pub async fn create_comment(&self, request: NewCommentRequest) -> Result<Comment> {
        let text = non_blank(Some(request.text))
            .ok_or_else(|| DomainError::bad_request("Comment text must not be blank"))?;

        let mut tx = self.store.begin().await?;
        tx.user_by_id(request.user).await?;
        tx.product_by_id(request.product).await?;

        let comment = tx
            .insert_comment(NewComment {
                user: request.user,
                product: request.product,
                text,
                rate: request.rate,
                status: CommentStatus::Submit,
            })
            .await?;
        tx.commit().await?;

        tracing::debug!(comment_id = %comment.id, "Comment saved");
        Ok(comment)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_comment(&self, id: CommentId) -> Result<Comment> {
        let key = self.key(id);
        let token = match self.cache.get(&key).await {
            Lookup::Hit(comment) => return Ok(comment),
            Lookup::Miss(token) => token,
        };

        let mut tx = self.store.begin().await?;
        let comment = tx
            .find_comment(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Comment", id))?;
        tx.commit().await?;

        self.cache.fill(key, &comment, token).await?;
        Ok(comment)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_comments(&self, request: PageRequest) -> Result<Page<Comment>> {
        let mut tx = self.store.begin().await?;
        let page = tx.page_comments(request).await?;
        tx.commit().await?;
        Ok(page)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_comments_by_user(
        &self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Page<Comment>> {
        let mut tx = self.store.begin().await?;
        let page = tx.page_comments_by_user(user, request).await?;
        tx.commit().await?;
        Ok(page)
    }

    /// Lists the comments of a product that are still SUBMIT.
    #[tracing::instrument(skip(self))]
    pub async fn load_comments_by_product(
        &self,
        product: ProductId,
        request: PageRequest,
    ) -> Result<Page<Comment>> {
        let mut tx = self.store.begin().await?;
        let page = tx
            .page_comments_by_product(product, CommentStatus::Submit, request)
            .await?;
        tx.commit().await?;
        Ok(page)
    }

    /// Moves a comment to a moderation status.
    #[tracing::instrument(skip(self))]
    pub async fn change_status(&self, id: CommentId, status: CommentStatus) -> Result<Comment> {
        let mut tx = self.store.begin().await?;
        let mut comment = tx
            .find_comment(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Comment", id))?;

        let from = comment.status;
        comment.status = status;
        let comment = tx.update_comment(&comment).await?;
        tx.commit().await?;

        self.cache.evict_all(&[self.key(id)]).await;
        tracing::debug!(comment_id = %id, %from, to = %status, "Comment status changed");
        Ok(comment)
    }

    /// Deletes a comment; a missing one is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn delete_comment(&self, id: CommentId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_comment(id).await? {
            return Ok(());
        }
        tx.commit().await?;

        self.cache.evict_all(&[self.key(id)]).await;
        tracing::debug!(comment_id = %id, "Comment deleted");
        Ok(())
    }
}
