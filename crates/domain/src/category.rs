//! Product categories.

use std::sync::Arc;

use cache::{CacheKey, EntityCache, KindCache, Lookup};
use common::{Category, CategoryId, NewCategory, Page, PageRequest};
use serde::Deserialize;
use store::Store;

use crate::edit::non_blank;
use crate::lookup::Lookups;
use crate::{DomainError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryEdit {
    pub name: Option<String>,
}

/// Service for managing categories, cached by id and by name.
pub struct CategoryService<S: Store> {
    store: S,
    cache: KindCache,
}

impl<S: Store> CategoryService<S> {
    pub fn new(store: S, cache: Arc<dyn EntityCache>) -> Self {
        Self {
            store,
            cache: KindCache::new("category", cache),
        }
    }

    fn keys(&self, category: &Category) -> Vec<CacheKey> {
        vec![
            self.cache.key("byId", category.id),
            self.cache.key("byName", &category.name),
        ]
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let name = non_blank(Some(name.to_string()))
            .ok_or_else(|| DomainError::bad_request("Category name must not be blank"))?;

        let mut tx = self.store.begin().await?;
        let category = tx.insert_category(NewCategory { name }).await?;
        tx.commit().await?;

        self.cache.evict_all(&self.keys(&category)).await;
        tracing::debug!(category_id = %category.id, "Category saved");
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_category(&self, id: CategoryId) -> Result<Category> {
        let key = self.cache.key("byId", id);
        let token = match self.cache.get(&key).await {
            Lookup::Hit(category) => return Ok(category),
            Lookup::Miss(token) => token,
        };

        let mut tx = self.store.begin().await?;
        let category = tx.category_by_id(id).await?;
        tx.commit().await?;

        self.cache.fill(key, &category, token).await?;
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_by_name(&self, name: &str) -> Result<Category> {
        let key = self.cache.key("byName", name);
        let token = match self.cache.get(&key).await {
            Lookup::Hit(category) => return Ok(category),
            Lookup::Miss(token) => token,
        };

        let mut tx = self.store.begin().await?;
        let category = tx
            .find_category_by_name(name)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", name))?;
        tx.commit().await?;

        self.cache.fill(key, &category, token).await?;
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_categories(&self, request: PageRequest) -> Result<Page<Category>> {
        let mut tx = self.store.begin().await?;
        let page = tx.page_categories(request).await?;
        tx.commit().await?;
        Ok(page)
    }

    #[tracing::instrument(skip(self))]
    pub async fn edit_category(&self, id: CategoryId, edit: CategoryEdit) -> Result<Category> {
        let mut tx = self.store.begin().await?;
        let mut category = tx.category_by_id(id).await?;
        let mut stale = self.keys(&category);

        if let Some(name) = non_blank(edit.name) {
            category.name = name;
        }

        let category = tx.update_category(&category).await?;
        tx.commit().await?;

        stale.extend(self.keys(&category));
        self.cache.evict_all(&stale).await;
        tracing::debug!(category_id = %id, "Category edited");
        Ok(category)
    }

    /// Deletes a category; a missing one is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let Some(category) = tx.find_category(id).await? else {
            return Ok(());
        };
        tx.delete_category(id).await?;
        tx.commit().await?;

        self.cache.evict_all(&self.keys(&category)).await;
        tracing::debug!(category_id = %id, "Category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cache::InMemoryEntityCache;
    use store::InMemoryStore;

    use super::*;

    fn service() -> CategoryService<InMemoryStore> {
        CategoryService::new(InMemoryStore::new(), Arc::new(InMemoryEntityCache::new()))
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let err = service().create_category("   ").await.unwrap_err();
        assert!(matches!(err, DomainError::BadRequest(_)));
    }

    #[tokio::test]
    async fn rename_is_visible_through_both_keys() {
        let service = service();
        let category = service.create_category("electronics").await.unwrap();
        service.load_category(category.id).await.unwrap();
        service.load_by_name("electronics").await.unwrap();

        service
            .edit_category(
                category.id,
                CategoryEdit {
                    name: Some("gadgets".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(service.load_category(category.id).await.unwrap().name, "gadgets");
        assert_eq!(service.load_by_name("gadgets").await.unwrap().id, category.id);
        assert!(matches!(
            service.load_by_name("electronics").await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn blank_edit_keeps_name() {
        let service = service();
        let category = service.create_category("books").await.unwrap();

        let edited = service
            .edit_category(category.id, CategoryEdit::default())
            .await
            .unwrap();
        assert_eq!(edited.name, "books");
    }

    #[tokio::test]
    async fn deleted_category_is_not_served_from_cache() {
        let service = service();
        let category = service.create_category("books").await.unwrap();
        service.load_category(category.id).await.unwrap();

        service.delete_category(category.id).await.unwrap();

        assert!(matches!(
            service.load_category(category.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn pages_are_ordered_by_id() {
        let service = service();
        for name in ["a", "b", "c"] {
            service.create_category(name).await.unwrap();
        }

        let page = service
            .load_categories(PageRequest::new(1, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "c");
    }
}
