use std::sync::Arc;

use cache::EntityCache;
use store::Store;

use crate::{
    CartService, CategoryService, CommentService, DiscountEngine, OrderService, ProductService,
    UserService,
};

/// All services of the shop, sharing one store and one cache.
pub struct Shop<S: Store> {
    pub users: UserService<S>,
    pub categories: CategoryService<S>,
    pub products: ProductService<S>,
    pub comments: CommentService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
}

impl<S: Store + Clone> Shop<S> {
    pub fn new(store: S, cache: Arc<dyn EntityCache>, discount: Arc<dyn DiscountEngine>) -> Self {
        Self {
            users: UserService::new(store.clone(), cache.clone()),
            categories: CategoryService::new(store.clone(), cache.clone()),
            products: ProductService::new(store.clone(), cache.clone()),
            comments: CommentService::new(store.clone(), cache.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store, cache, discount),
        }
    }
}
