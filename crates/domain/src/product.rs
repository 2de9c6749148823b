//! Catalog products.

use std::sync::Arc;

use cache::{CacheKey, EntityCache, KindCache, Lookup};
use common::{
    CategoryId, Decimal, NewProduct, PRICE_SCALE, Page, PageRequest, Product, ProductId,
    ProductStatus, ProductType, max_price,
};
use rust_decimal::RoundingStrategy;
use serde::Deserialize;
use store::Store;

use crate::edit::non_blank;
use crate::lookup::Lookups;
use crate::{DomainError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct NewProductRequest {
    pub name: String,
    pub category: CategoryId,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub product_type: ProductType,
    #[serde(default = "available")]
    pub status: ProductStatus,
}

fn available() -> ProductStatus {
    ProductStatus::Available
}

/// Validates a price and rounds it to the stored scale, half away from zero.
fn checked_price(price: Decimal) -> Result<Decimal> {
    if price.is_sign_negative() {
        return Err(DomainError::bad_request("Price must not be negative"));
    }
    let price = price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if price > max_price() {
        return Err(DomainError::bad_request(format!(
            "Price must not exceed {}",
            max_price()
        )));
    }
    Ok(price)
}

/// Partial update of a product.
///
/// Blank strings and a zero price leave the stored value unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductEdit {
    pub name: Option<String>,
    pub category: Option<CategoryId>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub product_type: Option<ProductType>,
    pub status: Option<ProductStatus>,
}

/// Service for managing products.
///
/// Only AVAILABLE products are returned by loads and listings; they are
/// cached by id and by name.
pub struct ProductService<S: Store> {
    store: S,
    cache: KindCache,
}

impl<S: Store> ProductService<S> {
    pub fn new(store: S, cache: Arc<dyn EntityCache>) -> Self {
        Self {
            store,
            cache: KindCache::new("product", cache),
        }
    }

    fn keys(&self, product: &Product) -> Vec<CacheKey> {
        vec![
            self.cache.key("byId", product.id),
            self.cache.key("byName", &product.name),
        ]
    }

    /// Creates a product in an existing category.
    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(&self, request: NewProductRequest) -> Result<Product> {
        let price = checked_price(request.price)?;

        let mut tx = self.store.begin().await?;
        tx.category_by_id(request.category).await?;

        let product = tx
            .insert_product(NewProduct {
                name: request.name,
                category: request.category,
                description: request.description,
                price,
                product_type: request.product_type,
                status: request.status,
            })
            .await?;
        tx.commit().await?;

        self.cache.evict_all(&self.keys(&product)).await;
        tracing::debug!(product_id = %product.id, "Product saved");
        Ok(product)
    }

    /// Loads an AVAILABLE product.
    #[tracing::instrument(skip(self))]
    pub async fn load_product(&self, id: ProductId) -> Result<Product> {
        let key = self.cache.key("byId", id);
        let token = match self.cache.get(&key).await {
            Lookup::Hit(product) => return Ok(product),
            Lookup::Miss(token) => token,
        };

        let mut tx = self.store.begin().await?;
        let product = tx.product_by_id(id).await?;
        tx.commit().await?;

        self.cache.fill(key, &product, token).await?;
        Ok(product)
    }

    /// Loads an AVAILABLE product by name.
    #[tracing::instrument(skip(self))]
    pub async fn load_by_name(&self, name: &str) -> Result<Product> {
        let key = self.cache.key("byName", name);
        let token = match self.cache.get(&key).await {
            Lookup::Hit(product) => return Ok(product),
            Lookup::Miss(token) => token,
        };

        let mut tx = self.store.begin().await?;
        let product = tx
            .find_product_by_name(name, &ProductStatus::VISIBLE)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", name))?;
        tx.commit().await?;

        self.cache.fill(key, &product, token).await?;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_products(&self, request: PageRequest) -> Result<Page<Product>> {
        let mut tx = self.store.begin().await?;
        let page = tx.page_products(&ProductStatus::VISIBLE, request).await?;
        tx.commit().await?;
        Ok(page)
    }

    #[tracing::instrument(skip(self, edit))]
    pub async fn edit_product(&self, id: ProductId, edit: ProductEdit) -> Result<Product> {
        let mut tx = self.store.begin().await?;
        let mut product = tx
            .find_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))?;
        let mut stale = self.keys(&product);

        if let Some(name) = non_blank(edit.name) {
            product.name = name;
        }
        if let Some(category) = edit.category {
            tx.category_by_id(category).await?;
            product.category = category;
        }
        if let Some(description) = non_blank(edit.description) {
            product.description = description;
        }
        if let Some(price) = edit.price.filter(|p| !p.is_zero()) {
            product.price = checked_price(price)?;
        }
        if let Some(product_type) = edit.product_type {
            product.product_type = product_type;
        }
        if let Some(status) = edit.status {
            product.status = status;
        }

        let product = tx.update_product(&product).await?;
        tx.commit().await?;

        stale.extend(self.keys(&product));
        self.cache.evict_all(&stale).await;
        tracing::debug!(product_id = %id, status = %product.status, "Product edited");
        Ok(product)
    }

    /// Case-insensitive search over name, description and price, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, text: &str) -> Result<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        let products = tx.search_products(text).await?;
        tx.commit().await?;
        Ok(products)
    }

    /// Deletes a product; a missing one is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let Some(product) = tx.find_product(id).await? else {
            return Ok(());
        };
        tx.delete_product(id).await?;
        tx.commit().await?;

        self.cache.evict_all(&self.keys(&product)).await;
        tracing::debug!(product_id = %id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cache::InMemoryEntityCache;
    use rust_decimal_macros::dec;
    use store::InMemoryStore;

    use super::*;
    use crate::CategoryService;

    struct Fixture {
        products: ProductService<InMemoryStore>,
        category: CategoryId,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let cache: Arc<dyn EntityCache> = Arc::new(InMemoryEntityCache::new());
        let categories = CategoryService::new(store.clone(), cache.clone());
        let category = categories.create_category("electronics").await.unwrap();
        Fixture {
            products: ProductService::new(store, cache),
            category: category.id,
        }
    }

    fn phone(category: CategoryId) -> NewProductRequest {
        NewProductRequest {
            name: "phone".to_string(),
            category,
            description: "smart phone".to_string(),
            price: dec!(100.00),
            product_type: ProductType::Main,
            status: ProductStatus::Available,
        }
    }

    #[tokio::test]
    async fn create_requires_existing_category() {
        let f = fixture().await;
        let err = f
            .products
            .create_product(phone(CategoryId::new(999)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Category", .. }));
    }

    #[tokio::test]
    async fn zero_price_edit_keeps_price() {
        let f = fixture().await;
        let product = f.products.create_product(phone(f.category)).await.unwrap();

        let edited = f
            .products
            .edit_product(
                product.id,
                ProductEdit {
                    price: Some(Decimal::ZERO),
                    description: Some(String::new()),
                    ..ProductEdit::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.price, dec!(100.00));
        assert_eq!(edited.description, "smart phone");
    }

    #[tokio::test]
    async fn discontinued_product_disappears_from_loads() {
        let f = fixture().await;
        let product = f.products.create_product(phone(f.category)).await.unwrap();
        f.products.load_product(product.id).await.unwrap();
        f.products.load_by_name("phone").await.unwrap();

        f.products
            .edit_product(
                product.id,
                ProductEdit {
                    status: Some(ProductStatus::Discontinue),
                    ..ProductEdit::default()
                },
            )
            .await
            .unwrap();

        assert!(f.products.load_product(product.id).await.is_err());
        assert!(f.products.load_by_name("phone").await.is_err());
        let page = f.products.load_products(PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn rename_evicts_old_name() {
        let f = fixture().await;
        let product = f.products.create_product(phone(f.category)).await.unwrap();
        f.products.load_by_name("phone").await.unwrap();

        f.products
            .edit_product(
                product.id,
                ProductEdit {
                    name: Some("smartphone".to_string()),
                    price: Some(dec!(120)),
                    ..ProductEdit::default()
                },
            )
            .await
            .unwrap();

        assert!(f.products.load_by_name("phone").await.is_err());
        let renamed = f.products.load_by_name("smartphone").await.unwrap();
        assert_eq!(renamed.price, dec!(120));
        assert_eq!(f.products.load_product(product.id).await.unwrap(), renamed);
    }

    #[tokio::test]
    async fn search_finds_by_description() {
        let f = fixture().await;
        f.products.create_product(phone(f.category)).await.unwrap();

        let found = f.products.search("SMART").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(f.products.search("laptop").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_finds_by_price() {
        let f = fixture().await;
        let product = f.products.create_product(phone(f.category)).await.unwrap();

        let found = f.products.search("100").await.unwrap();
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), [product.id]);
        assert!(f.products.search("250").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn price_beyond_column_range_is_rejected() {
        let f = fixture().await;
        let mut request = phone(f.category);
        request.price = Decimal::MAX;
        let err = f.products.create_product(request).await.unwrap_err();
        assert!(matches!(err, DomainError::BadRequest(_)));

        let mut request = phone(f.category);
        request.price = max_price();
        let product = f.products.create_product(request).await.unwrap();
        let err = f
            .products
            .edit_product(
                product.id,
                ProductEdit {
                    price: Some(max_price() + Decimal::ONE),
                    ..ProductEdit::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::BadRequest(_)));
        assert_eq!(f.products.load_product(product.id).await.unwrap().price, max_price());
    }

    #[tokio::test]
    async fn price_is_rounded_to_four_places() {
        let f = fixture().await;
        let mut request = phone(f.category);
        request.price = dec!(19.99995);
        let product = f.products.create_product(request).await.unwrap();
        assert_eq!(product.price, dec!(20.0000));
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let f = fixture().await;
        let mut request = phone(f.category);
        request.price = dec!(-1);
        let err = f.products.create_product(request).await.unwrap_err();
        assert!(matches!(err, DomainError::BadRequest(_)));
    }
}
