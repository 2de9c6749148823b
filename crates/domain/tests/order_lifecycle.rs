//! Integration tests for the order lifecycle.
//!
//! These tests drive the services end to end over the in-memory store,
//! including concurrent order creation for a single user.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cache::{CacheKey, EntityCache, FillToken, InMemoryEntityCache};
use common::{
    Authority, CartId, CartStatus, Decimal, LineItem, NewCart, OrderStatus, ProductStatus,
    ProductType, UserId,
};
use domain::{DomainError, NewProductRequest, NewUserRequest, NoDiscount, Shop};
use futures_util::future::join_all;
use rust_decimal_macros::dec;
use serde_json::Value;
use store::{InMemoryStore, Store};

/// Helper to create a shop over fresh in-memory infrastructure
fn create_shop() -> (Arc<Shop<InMemoryStore>>, InMemoryStore) {
    let store = InMemoryStore::new();
    let shop = Shop::new(
        store.clone(),
        Arc::new(InMemoryEntityCache::new()),
        Arc::new(NoDiscount),
    );
    (Arc::new(shop), store)
}

fn registration(username: &str) -> NewUserRequest {
    NewUserRequest {
        username: username.to_string(),
        password: "secret".to_string(),
        email: format!("{username}@example.com"),
        name: "Test".to_string(),
        family: "User".to_string(),
        authorities: BTreeSet::from([Authority::User]),
    }
}

/// Seeds "electronics" / "phone" at 100.00 and an active user.
async fn seed_phone(shop: &Shop<InMemoryStore>) -> (UserId, common::ProductId) {
    let category = shop.categories.create_category("electronics").await.unwrap();
    let phone = shop
        .products
        .create_product(NewProductRequest {
            name: "phone".to_string(),
            category: category.id,
            description: "smart phone".to_string(),
            price: dec!(100.00),
            product_type: ProductType::Main,
            status: ProductStatus::Available,
        })
        .await
        .unwrap();
    let user = shop.users.create_user(registration("alice"), true).await.unwrap();
    (user.id, phone.id)
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn phone_order_is_priced_from_cart() {
        let (shop, _) = create_shop();
        let (user, phone) = seed_phone(&shop).await;

        let cart = shop
            .carts
            .create_or_update_cart(user, phone, 2)
            .await
            .unwrap();
        assert_eq!(shop.carts.calculate_total(&cart).unwrap(), dec!(200.00));

        let order = shop.orders.create_order(user, cart.id).await.unwrap();
        assert_eq!(order.price, dec!(200.00));
        assert_eq!(order.total, dec!(200.00));
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.cart, cart.id);
    }

    #[tokio::test]
    async fn new_order_supersedes_open_order() {
        let (shop, _) = create_shop();
        let (user, phone) = seed_phone(&shop).await;

        let first_cart = shop.carts.create_or_update_cart(user, phone, 1).await.unwrap();
        let a = shop.orders.create_order(user, first_cart.id).await.unwrap();
        // populate both order keys before the superseding write
        shop.orders.load_order(a.id).await.unwrap();
        shop.orders.load_current_order_by_user(user).await.unwrap();

        let second_cart = shop.carts.create_or_update_cart(user, phone, 3).await.unwrap();
        assert_ne!(first_cart.id, second_cart.id);
        let b = shop.orders.create_order(user, second_cart.id).await.unwrap();

        assert_eq!(shop.orders.load_order(a.id).await.unwrap().status, OrderStatus::Cancel);
        assert_eq!(shop.orders.load_order(b.id).await.unwrap().status, OrderStatus::Open);
        assert_eq!(shop.orders.load_current_order_by_user(user).await.unwrap().id, b.id);
        assert_eq!(b.price, dec!(300.00));
    }

    #[tokio::test]
    async fn empty_cart_orders_at_zero() {
        let (shop, store) = create_shop();
        let (user, _) = seed_phone(&shop).await;

        let mut tx = store.begin().await.unwrap();
        let cart = tx
            .insert_cart(NewCart {
                user,
                status: CartStatus::Open,
                items: Vec::new(),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let order = shop.orders.create_order(user, cart.id).await.unwrap();
        assert_eq!(order.price, dec!(0));
        assert_eq!(order.total, dec!(0));
    }

    #[tokio::test]
    async fn overflowing_cart_is_a_bad_request() {
        let (shop, store) = create_shop();
        let (user, phone) = seed_phone(&shop).await;

        let mut tx = store.begin().await.unwrap();
        let cart = tx
            .insert_cart(NewCart {
                user,
                status: CartStatus::Open,
                items: vec![LineItem::new(phone, ProductType::Main, 3, Decimal::MAX)],
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let err = shop.orders.create_order(user, cart.id).await.unwrap_err();
        assert!(matches!(err, DomainError::BadRequest(_)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(
            shop.carts.load_cart(cart.id).await.unwrap().status,
            CartStatus::Open
        );
    }

    #[tokio::test]
    async fn unknown_user_cannot_order() {
        let (shop, _) = create_shop();
        let err = shop
            .orders
            .create_order(UserId::new(404), CartId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "User", .. }));
    }

    #[tokio::test]
    async fn user_without_open_order_has_no_current_order() {
        let (shop, _) = create_shop();
        let (user, _) = seed_phone(&shop).await;

        let err = shop.orders.load_current_order_by_user(user).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn order_history_lists_every_order() {
        let (shop, _) = create_shop();
        let (user, phone) = seed_phone(&shop).await;

        for quantity in 1..=3 {
            let cart = shop
                .carts
                .create_or_update_cart(user, phone, quantity)
                .await
                .unwrap();
            shop.orders.create_order(user, cart.id).await.unwrap();
        }

        let page = shop
            .orders
            .load_orders_by_user(user, common::PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let open = page
            .items
            .iter()
            .filter(|o| o.status == OrderStatus::Open)
            .count();
        assert_eq!(open, 1);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_leave_one_open() {
        let (shop, store) = create_shop();
        let (user, phone) = seed_phone(&shop).await;
        let cart = shop.carts.create_or_update_cart(user, phone, 1).await.unwrap().id;

        let tasks = (0..16).map(|_| {
            let shop = shop.clone();
            tokio::spawn(async move { shop.orders.create_order(user, cart).await })
        });
        let results = join_all(tasks).await;

        for result in results {
            match result.unwrap() {
                Ok(order) => assert_eq!(order.user, user),
                Err(DomainError::Conflict(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        let orders = store.orders_of(user).await;
        let open = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Open)
            .count();
        assert_eq!(open, 1);
        assert_eq!(
            shop.orders.load_current_order_by_user(user).await.unwrap().status,
            OrderStatus::Open
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn separate_service_instances_still_leave_one_open() {
        // Two shops share the store but not their lock registries, like two
        // processes sharing a database.
        let store = InMemoryStore::new();
        let cache = Arc::new(InMemoryEntityCache::new());
        let left = Arc::new(Shop::new(store.clone(), cache.clone(), Arc::new(NoDiscount)));
        let right = Arc::new(Shop::new(store.clone(), cache, Arc::new(NoDiscount)));
        let (user, phone) = seed_phone(&left).await;
        let cart = left.carts.create_or_update_cart(user, phone, 1).await.unwrap().id;

        let tasks = (0..16).map(|i| {
            let shop = if i % 2 == 0 { left.clone() } else { right.clone() };
            tokio::spawn(async move { shop.orders.create_order(user, cart).await })
        });
        for result in join_all(tasks).await {
            match result.unwrap() {
                Ok(_) | Err(DomainError::Conflict(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        let open = store
            .orders_of(user)
            .await
            .into_iter()
            .filter(|o| o.status == OrderStatus::Open)
            .count();
        assert_eq!(open, 1);
    }

    /// Delays every read-through fill, widening the window between a
    /// loader's store read and its cache write.
    struct SlowFillCache {
        inner: InMemoryEntityCache,
        delay: Duration,
    }

    #[async_trait]
    impl EntityCache for SlowFillCache {
        async fn get(&self, key: &CacheKey) -> Option<Value> {
            self.inner.get(key).await
        }

        async fn put(&self, key: CacheKey, value: Value) {
            self.inner.put(key, value).await;
        }

        async fn fill_token(&self, key: &CacheKey) -> FillToken {
            self.inner.fill_token(key).await
        }

        async fn fill(&self, key: CacheKey, value: Value, token: FillToken) -> bool {
            tokio::time::sleep(self.delay).await;
            self.inner.fill(key, value, token).await
        }

        async fn evict(&self, key: &CacheKey) {
            self.inner.evict(key).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn late_fill_does_not_resurrect_superseded_order() {
        let cache = Arc::new(SlowFillCache {
            inner: InMemoryEntityCache::new(),
            delay: Duration::from_millis(100),
        });
        let shop = Arc::new(Shop::new(InMemoryStore::new(), cache, Arc::new(NoDiscount)));
        let (user, phone) = seed_phone(&shop).await;

        let first = shop.carts.create_or_update_cart(user, phone, 1).await.unwrap();
        let a = shop.orders.create_order(user, first.id).await.unwrap();

        // The loader reads A, then stalls before filling the cache.
        let loader = {
            let shop = shop.clone();
            tokio::spawn(async move { shop.orders.load_current_order_by_user(user).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        let second = shop.carts.create_or_update_cart(user, phone, 2).await.unwrap();
        let b = shop.orders.create_order(user, second.id).await.unwrap();

        assert_eq!(loader.await.unwrap().unwrap().id, a.id);

        let current = shop.orders.load_current_order_by_user(user).await.unwrap();
        assert_eq!(current.id, b.id);
        assert_eq!(current.status, OrderStatus::Open);
        assert_eq!(shop.orders.load_order(a.id).await.unwrap().status, OrderStatus::Cancel);
    }
}
