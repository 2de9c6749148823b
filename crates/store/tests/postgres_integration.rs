//! PostgreSQL integration tests
//!
//! These tests start a shared PostgreSQL container and need Docker.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{
    Authority, CartStatus, CommentStatus, Discount, LineItem, NewCart, NewCategory, NewComment,
    NewOrder, NewProduct, NewUser, OrderStatus, PageRequest, ProductStatus, ProductType, Rate,
    UserStatus,
};
use rust_decimal_macros::dec;
use sqlx::PgPool;
use store::{ONE_OPEN_ORDER_PER_USER, PostgresStore, Store, UNIQUE_LIVE_USERNAME};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_shop_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE users, categories, products, comments, carts, cart_items, orders RESTART IDENTITY",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        password: "secret".to_string(),
        email: format!("{username}@example.com"),
        name: "Test".to_string(),
        family: "User".to_string(),
        status: UserStatus::Active,
        authorities: BTreeSet::from([Authority::User]),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn user_round_trips_through_postgres() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let user = tx.insert_user(new_user("alice")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let found = tx.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(found.username, "alice");
    assert_eq!(found.status, UserStatus::Active);
    assert!(found.authorities.contains(&Authority::User));

    let hidden = tx
        .find_user_with_status(user.id, &[UserStatus::Banned])
        .await
        .unwrap();
    assert!(hidden.is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn live_username_is_unique() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_user(new_user("bob")).await.unwrap();
    let err = tx.insert_user(new_user("bob")).await.unwrap_err();
    assert!(err.violates(UNIQUE_LIVE_USERNAME));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_category(NewCategory {
            name: "electronics".to_string(),
        })
        .await
        .unwrap();
    }

    let mut tx = store.begin().await.unwrap();
    let page = tx.page_categories(PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn cart_items_keep_their_order_and_price() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let user = tx.insert_user(new_user("carol")).await.unwrap();
    let category = tx
        .insert_category(NewCategory {
            name: "electronics".to_string(),
        })
        .await
        .unwrap();
    let phone = tx
        .insert_product(NewProduct {
            name: "phone".to_string(),
            category: category.id,
            description: "smart".to_string(),
            price: dec!(100.00),
            product_type: ProductType::Main,
            status: ProductStatus::Available,
        })
        .await
        .unwrap();
    let case = tx
        .insert_product(NewProduct {
            name: "case".to_string(),
            category: category.id,
            description: String::new(),
            price: dec!(9.50),
            product_type: ProductType::Side,
            status: ProductStatus::Available,
        })
        .await
        .unwrap();

    let cart = tx
        .insert_cart(NewCart {
            user: user.id,
            status: CartStatus::Open,
            items: vec![
                LineItem::new(phone.id, phone.product_type, 2, phone.price),
                LineItem::new(case.id, case.product_type, 1, case.price),
            ],
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let loaded = tx
        .find_cart_by_user(user.id, &CartStatus::ACTIVE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, cart.id);
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].product, phone.id);
    assert_eq!(loaded.items[0].total(), Some(dec!(200.00)));
    assert_eq!(loaded.items[1].price, dec!(9.50));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn second_open_order_violates_partial_index() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let user = tx.insert_user(new_user("dave")).await.unwrap();
    let cart = tx
        .insert_cart(NewCart {
            user: user.id,
            status: CartStatus::Open,
            items: Vec::new(),
        })
        .await
        .unwrap();

    let first = tx
        .insert_order(NewOrder::open(user.id, cart.id, dec!(10), Discount::none()))
        .await
        .unwrap();
    assert_eq!(first.status, OrderStatus::Open);
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .insert_order(NewOrder::open(user.id, cart.id, dec!(20), Discount::none()))
        .await
        .unwrap_err();
    assert!(err.violates(ONE_OPEN_ORDER_PER_USER));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn comments_by_product_filter_on_status() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let user = tx.insert_user(new_user("erin")).await.unwrap();
    let category = tx
        .insert_category(NewCategory {
            name: "books".to_string(),
        })
        .await
        .unwrap();
    let book = tx
        .insert_product(NewProduct {
            name: "novel".to_string(),
            category: category.id,
            description: String::new(),
            price: dec!(15),
            product_type: ProductType::Main,
            status: ProductStatus::Available,
        })
        .await
        .unwrap();

    for (text, status) in [("great", CommentStatus::Submit), ("spam", CommentStatus::Reject)] {
        tx.insert_comment(NewComment {
            user: user.id,
            product: book.id,
            text: text.to_string(),
            rate: Rate::Five,
            status,
        })
        .await
        .unwrap();
    }

    let page = tx
        .page_comments_by_product(book.id, CommentStatus::Submit, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].text, "great");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn search_is_case_insensitive() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let category = tx
        .insert_category(NewCategory {
            name: "electronics".to_string(),
        })
        .await
        .unwrap();
    tx.insert_product(NewProduct {
        name: "Phone".to_string(),
        category: category.id,
        description: "a smart device".to_string(),
        price: dec!(100),
        product_type: ProductType::Main,
        status: ProductStatus::Available,
    })
    .await
    .unwrap();

    assert_eq!(tx.search_products("PHONE").await.unwrap().len(), 1);
    assert_eq!(tx.search_products("smart").await.unwrap().len(), 1);
    assert!(tx.search_products("tablet").await.unwrap().is_empty());
    assert_eq!(tx.search_products("100.0000").await.unwrap().len(), 1);
}
