//! HTTP API server with observability for the shop backend.
//!
//! Exposes the catalog, cart and order services as JSON endpoints,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use cache::{CacheConfig, EntityCache, InMemoryEntityCache};
use domain::{NoDiscount, Shop};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    shop: Arc<Shop<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{auth, carts, categories, comments, orders, products, users};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth/login", post(auth::login::<S>))
        .route("/users", post(users::create::<S>).get(users::list::<S>))
        .route(
            "/users/{id}",
            get(users::get::<S>)
                .put(users::edit::<S>)
                .delete(users::safe_delete::<S>),
        )
        .route("/users/{id}/record", axum::routing::delete(users::delete::<S>))
        .route("/users/{id}/ban", post(users::ban::<S>))
        .route("/users/{id}/freeze", post(users::freeze::<S>))
        .route("/users/{id}/cart", get(carts::get_open::<S>))
        .route("/users/{id}/comments", get(comments::list_by_user::<S>))
        .route("/users/{id}/orders", get(orders::list_by_user::<S>))
        .route("/users/{id}/orders/current", get(orders::current::<S>))
        .route("/users/by-username/{username}", get(users::get_by_username::<S>))
        .route(
            "/categories",
            post(categories::create::<S>).get(categories::list::<S>),
        )
        .route(
            "/categories/{id}",
            get(categories::get::<S>)
                .put(categories::edit::<S>)
                .delete(categories::delete::<S>),
        )
        .route("/categories/by-name/{name}", get(categories::get_by_name::<S>))
        .route("/products", post(products::create::<S>).get(products::list::<S>))
        .route("/products/search", get(products::search::<S>))
        .route(
            "/products/{id}",
            get(products::get::<S>)
                .put(products::edit::<S>)
                .delete(products::delete::<S>),
        )
        .route("/products/{id}/comments", get(comments::list_by_product::<S>))
        .route("/products/by-name/{name}", get(products::get_by_name::<S>))
        .route("/comments", post(comments::create::<S>).get(comments::list::<S>))
        .route(
            "/comments/{id}",
            get(comments::get::<S>).delete(comments::delete::<S>),
        )
        .route("/comments/{id}/status", put(comments::change_status::<S>))
        .route("/carts/items", post(carts::add_item::<S>))
        .route(
            "/carts/{id}",
            get(carts::get::<S>).delete(carts::delete::<S>),
        )
        .route("/orders", post(orders::create::<S>))
        .route(
            "/orders/{id}",
            get(orders::get::<S>).delete(orders::delete::<S>),
        )
        .route("/orders/{id}/cancel", post(orders::cancel::<S>))
        .with_state(shop)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the services over `store` with an in-memory entity cache.
///
/// Orders are priced without promotions until a discount engine is plugged in.
pub fn create_shop<S: Store + Clone + 'static>(store: S, cache_config: CacheConfig) -> Arc<Shop<S>> {
    let cache: Arc<dyn EntityCache> = Arc::new(InMemoryEntityCache::with_config(cache_config));
    Arc::new(Shop::new(store, cache, Arc::new(NoDiscount)))
}
