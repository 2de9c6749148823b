use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    Cart, CartId, CartStatus, Category, CategoryId, Comment, CommentId, CommentStatus, Decimal,
    NewCart, NewCategory, NewComment, NewOrder, NewProduct, NewUser, Order, OrderId, OrderStatus,
    PRICE_SCALE, Page, PageRequest, Product, ProductId, ProductStatus, User, UserId, UserStatus,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    ONE_OPEN_ORDER_PER_USER, Result, StoreError, UNIQUE_LIVE_USERNAME,
    store::{
        CartRepository, CategoryRepository, CommentRepository, OrderRepository,
        ProductRepository, Store, Transaction, UserRepository,
    },
};

#[derive(Debug, Clone, Default)]
struct Tables {
    sequence: i64,
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    comments: BTreeMap<CommentId, Comment>,
    carts: BTreeMap<CartId, Cart>,
    orders: BTreeMap<OrderId, Order>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn check_live_username(&self, id: Option<UserId>, username: &str, status: UserStatus) -> Result<()> {
        if !status.is_visible() {
            return Ok(());
        }
        let taken = self.users.values().any(|u| {
            Some(u.id) != id && u.status.is_visible() && u.username == username
        });
        if taken {
            return Err(StoreError::unique(UNIQUE_LIVE_USERNAME));
        }
        Ok(())
    }

    fn check_open_order(&self, id: Option<OrderId>, user: UserId, status: OrderStatus) -> Result<()> {
        if status != OrderStatus::Open {
            return Ok(());
        }
        let taken = self
            .orders
            .values()
            .any(|o| Some(o.id) != id && o.user == user && o.status == OrderStatus::Open);
        if taken {
            return Err(StoreError::unique(ONE_OPEN_ORDER_PER_USER));
        }
        Ok(())
    }
}

/// A price as PostgreSQL prints a `NUMERIC(19, 4)` column.
fn price_text(price: Decimal) -> String {
    format!("{:.*}", PRICE_SCALE as usize, price)
}

/// In-memory store implementation for tests and local runs.
///
/// Transactions are fully serialized: [`Store::begin`] takes the table lock
/// and holds it until the transaction is committed or dropped. The same
/// unique constraints as the PostgreSQL schema are enforced on write.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Returns all orders of a user, in creation order.
    pub async fn orders_of(&self, user: UserId) -> Vec<Order> {
        self.tables
            .lock()
            .await
            .orders
            .values()
            .filter(|o| o.user == user)
            .cloned()
            .collect()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        *self.tables.lock().await = Tables::default();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.tables.clone().lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            guard,
            working: None,
        }))
    }
}

/// A transaction over the locked tables.
///
/// Reads see the committed tables until the first write, which copies them
/// into a private working set. Read-only transactions never copy.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Option<Tables>,
}

impl InMemoryTransaction {
    fn tables(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn tables_mut(&mut self) -> &mut Tables {
        let committed = &self.guard;
        self.working.get_or_insert_with(|| Tables::clone(committed))
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn lock_user(&mut self, _id: UserId) -> Result<()> {
        // The table lock held by this transaction already excludes every other writer.
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, working } = *self;
        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryTransaction {
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn find_user_with_status(
        &mut self,
        id: UserId,
        statuses: &[UserStatus],
    ) -> Result<Option<User>> {
        Ok(self
            .tables()
            .users
            .get(&id)
            .filter(|u| statuses.contains(&u.status))
            .cloned())
    }

    async fn find_user_by_username(
        &mut self,
        username: &str,
        statuses: &[UserStatus],
    ) -> Result<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.username == username && statuses.contains(&u.status))
            .cloned())
    }

    async fn find_user_by_credentials(
        &mut self,
        username: &str,
        password: &str,
        statuses: &[UserStatus],
    ) -> Result<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| {
                u.username == username && u.password == password && statuses.contains(&u.status)
            })
            .cloned())
    }

    async fn page_users(
        &mut self,
        statuses: &[UserStatus],
        request: PageRequest,
    ) -> Result<Page<User>> {
        let users = self
            .tables()
            .users
            .values()
            .filter(|u| statuses.contains(&u.status))
            .cloned()
            .collect();
        Ok(Page::from_all(users, request))
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        self.tables().check_live_username(None, &user.username, user.status)?;
        let now = Utc::now();
        let id = UserId::new(self.tables_mut().next_id());
        let stored = User {
            id,
            username: user.username,
            password: user.password,
            email: user.email,
            name: user.name,
            family: user.family,
            status: user.status,
            authorities: user.authorities,
            created: now,
            changed: now,
        };
        self.tables_mut().users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_user(&mut self, user: &User) -> Result<User> {
        if !self.tables().users.contains_key(&user.id) {
            return Err(StoreError::RowNotFound {
                entity: "user",
                id: user.id.as_i64(),
            });
        }
        self.tables().check_live_username(Some(user.id), &user.username, user.status)?;
        let mut stored = user.clone();
        stored.changed = Utc::now();
        self.tables_mut().users.insert(user.id, stored.clone());
        Ok(stored)
    }

    async fn delete_user(&mut self, id: UserId) -> Result<bool> {
        Ok(self.tables_mut().users.remove(&id).is_some())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryTransaction {
    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.tables().categories.get(&id).cloned())
    }

    async fn find_category_by_name(&mut self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .tables()
            .categories
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn page_categories(&mut self, request: PageRequest) -> Result<Page<Category>> {
        let categories = self.tables().categories.values().cloned().collect();
        Ok(Page::from_all(categories, request))
    }

    async fn insert_category(&mut self, category: NewCategory) -> Result<Category> {
        let now = Utc::now();
        let id = CategoryId::new(self.tables_mut().next_id());
        let stored = Category {
            id,
            name: category.name,
            created: now,
            changed: now,
        };
        self.tables_mut().categories.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_category(&mut self, category: &Category) -> Result<Category> {
        let Some(row) = self.tables_mut().categories.get_mut(&category.id) else {
            return Err(StoreError::RowNotFound {
                entity: "category",
                id: category.id.as_i64(),
            });
        };
        *row = category.clone();
        row.changed = Utc::now();
        Ok(row.clone())
    }

    async fn delete_category(&mut self, id: CategoryId) -> Result<bool> {
        Ok(self.tables_mut().categories.remove(&id).is_some())
    }
}

#[async_trait]
impl ProductRepository for InMemoryTransaction {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables().products.get(&id).cloned())
    }

    async fn find_product_with_status(
        &mut self,
        id: ProductId,
        statuses: &[ProductStatus],
    ) -> Result<Option<Product>> {
        Ok(self
            .tables()
            .products
            .get(&id)
            .filter(|p| statuses.contains(&p.status))
            .cloned())
    }

    async fn find_product_by_name(
        &mut self,
        name: &str,
        statuses: &[ProductStatus],
    ) -> Result<Option<Product>> {
        Ok(self
            .tables()
            .products
            .values()
            .find(|p| p.name == name && statuses.contains(&p.status))
            .cloned())
    }

    async fn page_products(
        &mut self,
        statuses: &[ProductStatus],
        request: PageRequest,
    ) -> Result<Page<Product>> {
        let products = self
            .tables()
            .products
            .values()
            .filter(|p| statuses.contains(&p.status))
            .cloned()
            .collect();
        Ok(Page::from_all(products, request))
    }

    async fn search_products(&mut self, text: &str) -> Result<Vec<Product>> {
        let needle = text.to_lowercase();
        let mut found: Vec<Product> = self
            .tables()
            .products
            .values()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
                    || price_text(p.price).contains(&needle)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn insert_product(&mut self, product: NewProduct) -> Result<Product> {
        let now = Utc::now();
        let id = ProductId::new(self.tables_mut().next_id());
        let stored = Product {
            id,
            name: product.name,
            category: product.category,
            description: product.description,
            price: product.price,
            product_type: product.product_type,
            status: product.status,
            created: now,
            changed: now,
        };
        self.tables_mut().products.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_product(&mut self, product: &Product) -> Result<Product> {
        let Some(row) = self.tables_mut().products.get_mut(&product.id) else {
            return Err(StoreError::RowNotFound {
                entity: "product",
                id: product.id.as_i64(),
            });
        };
        *row = product.clone();
        row.changed = Utc::now();
        Ok(row.clone())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        Ok(self.tables_mut().products.remove(&id).is_some())
    }
}

#[async_trait]
impl CommentRepository for InMemoryTransaction {
    async fn find_comment(&mut self, id: CommentId) -> Result<Option<Comment>> {
        Ok(self.tables().comments.get(&id).cloned())
    }

    async fn page_comments(&mut self, request: PageRequest) -> Result<Page<Comment>> {
        let comments = self.tables().comments.values().cloned().collect();
        Ok(Page::from_all(comments, request))
    }

    async fn page_comments_by_user(
        &mut self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Page<Comment>> {
        let comments = self
            .tables()
            .comments
            .values()
            .filter(|c| c.user == user)
            .cloned()
            .collect();
        Ok(Page::from_all(comments, request))
    }

    async fn page_comments_by_product(
        &mut self,
        product: ProductId,
        status: CommentStatus,
        request: PageRequest,
    ) -> Result<Page<Comment>> {
        let comments = self
            .tables()
            .comments
            .values()
            .filter(|c| c.product == product && c.status == status)
            .cloned()
            .collect();
        Ok(Page::from_all(comments, request))
    }

    async fn insert_comment(&mut self, comment: NewComment) -> Result<Comment> {
        let now = Utc::now();
        let id = CommentId::new(self.tables_mut().next_id());
        let stored = Comment {
            id,
            user: comment.user,
            product: comment.product,
            text: comment.text,
            rate: comment.rate,
            status: comment.status,
            created: now,
            changed: now,
        };
        self.tables_mut().comments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_comment(&mut self, comment: &Comment) -> Result<Comment> {
        let Some(row) = self.tables_mut().comments.get_mut(&comment.id) else {
            return Err(StoreError::RowNotFound {
                entity: "comment",
                id: comment.id.as_i64(),
            });
        };
        *row = comment.clone();
        row.changed = Utc::now();
        Ok(row.clone())
    }

    async fn delete_comment(&mut self, id: CommentId) -> Result<bool> {
        Ok(self.tables_mut().comments.remove(&id).is_some())
    }
}

#[async_trait]
impl CartRepository for InMemoryTransaction {
    async fn find_cart(&mut self, id: CartId) -> Result<Option<Cart>> {
        Ok(self.tables().carts.get(&id).cloned())
    }

    async fn find_cart_by_user(
        &mut self,
        user: UserId,
        statuses: &[CartStatus],
    ) -> Result<Option<Cart>> {
        Ok(self
            .tables()
            .carts
            .values()
            .rev()
            .find(|c| c.user == user && statuses.contains(&c.status))
            .cloned())
    }

    async fn insert_cart(&mut self, cart: NewCart) -> Result<Cart> {
        let now = Utc::now();
        let id = CartId::new(self.tables_mut().next_id());
        let stored = Cart {
            id,
            user: cart.user,
            status: cart.status,
            items: cart.items,
            created: now,
            changed: now,
        };
        self.tables_mut().carts.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_cart(&mut self, cart: &Cart) -> Result<Cart> {
        let Some(row) = self.tables_mut().carts.get_mut(&cart.id) else {
            return Err(StoreError::RowNotFound {
                entity: "cart",
                id: cart.id.as_i64(),
            });
        };
        row.status = cart.status;
        row.items = cart.items.clone();
        row.changed = Utc::now();
        Ok(row.clone())
    }

    async fn delete_cart(&mut self, id: CartId) -> Result<bool> {
        Ok(self.tables_mut().carts.remove(&id).is_some())
    }
}

#[async_trait]
impl OrderRepository for InMemoryTransaction {
    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables().orders.get(&id).cloned())
    }

    async fn find_order_by_user_and_status(
        &mut self,
        user: UserId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        Ok(self
            .tables()
            .orders
            .values()
            .find(|o| o.user == user && o.status == status)
            .cloned())
    }

    async fn page_orders_by_user(
        &mut self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Page<Order>> {
        let orders = self
            .tables()
            .orders
            .values()
            .filter(|o| o.user == user)
            .cloned()
            .collect();
        Ok(Page::from_all(orders, request))
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        self.tables().check_open_order(None, order.user, order.status)?;
        let now = Utc::now();
        let id = OrderId::new(self.tables_mut().next_id());
        let stored = Order {
            id,
            user: order.user,
            cart: order.cart,
            price: order.price,
            discount: order.discount,
            total: order.total,
            status: order.status,
            created: now,
            changed: now,
        };
        self.tables_mut().orders.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_order(&mut self, order: &Order) -> Result<Order> {
        if !self.tables().orders.contains_key(&order.id) {
            return Err(StoreError::RowNotFound {
                entity: "order",
                id: order.id.as_i64(),
            });
        }
        self.tables().check_open_order(Some(order.id), order.user, order.status)?;
        let mut stored = order.clone();
        stored.changed = Utc::now();
        self.tables_mut().orders.insert(order.id, stored.clone());
        Ok(stored)
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool> {
        Ok(self.tables_mut().orders.remove(&id).is_some())
    }
}
