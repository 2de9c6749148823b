use async_trait::async_trait;
use common::{
    Cart, CartId, CartStatus, Category, CategoryId, Comment, CommentId, CommentStatus, NewCart,
    NewCategory, NewComment, NewOrder, NewProduct, NewUser, Order, OrderId, OrderStatus, Page,
    PageRequest, Product, ProductId, ProductStatus, User, UserId, UserStatus,
};

use crate::Result;

/// Entry point to the persistent store.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Starts a transaction.
    ///
    /// The returned transaction is rolled back when dropped without a commit.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

/// A unit of work against the store.
///
/// Repository methods issued through one transaction see each other's
/// writes; other transactions see them only after [`Transaction::commit`].
#[async_trait]
pub trait Transaction:
    UserRepository
    + CategoryRepository
    + ProductRepository
    + CommentRepository
    + CartRepository
    + OrderRepository
    + Send
{
    /// Takes an exclusive lock on the user's row until this transaction ends.
    ///
    /// Two transactions locking the same user are serialized. Locking a
    /// user that does not exist is not an error.
    async fn lock_user(&mut self, id: UserId) -> Result<()>;

    /// Makes every write of this transaction visible.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write of this transaction.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait UserRepository {
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>>;

    /// Finds a user whose status is one of `statuses`.
    async fn find_user_with_status(
        &mut self,
        id: UserId,
        statuses: &[UserStatus],
    ) -> Result<Option<User>>;

    async fn find_user_by_username(
        &mut self,
        username: &str,
        statuses: &[UserStatus],
    ) -> Result<Option<User>>;

    async fn find_user_by_credentials(
        &mut self,
        username: &str,
        password: &str,
        statuses: &[UserStatus],
    ) -> Result<Option<User>>;

    /// Lists users whose status is one of `statuses`, ordered by id.
    async fn page_users(
        &mut self,
        statuses: &[UserStatus],
        request: PageRequest,
    ) -> Result<Page<User>>;

    async fn insert_user(&mut self, user: NewUser) -> Result<User>;

    /// Overwrites the stored row and refreshes its `changed` timestamp.
    async fn update_user(&mut self, user: &User) -> Result<User>;

    /// Removes the row. Returns false if it did not exist.
    async fn delete_user(&mut self, id: UserId) -> Result<bool>;
}

#[async_trait]
pub trait CategoryRepository {
    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>>;

    async fn find_category_by_name(&mut self, name: &str) -> Result<Option<Category>>;

    async fn page_categories(&mut self, request: PageRequest) -> Result<Page<Category>>;

    async fn insert_category(&mut self, category: NewCategory) -> Result<Category>;

    async fn update_category(&mut self, category: &Category) -> Result<Category>;

    async fn delete_category(&mut self, id: CategoryId) -> Result<bool>;
}

#[async_trait]
pub trait ProductRepository {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    async fn find_product_with_status(
        &mut self,
        id: ProductId,
        statuses: &[ProductStatus],
    ) -> Result<Option<Product>>;

    async fn find_product_by_name(
        &mut self,
        name: &str,
        statuses: &[ProductStatus],
    ) -> Result<Option<Product>>;

    async fn page_products(
        &mut self,
        statuses: &[ProductStatus],
        request: PageRequest,
    ) -> Result<Page<Product>>;

    /// Case-insensitive substring match on name, description or the price
    /// printed with four fraction digits, newest first.
    async fn search_products(&mut self, text: &str) -> Result<Vec<Product>>;

    async fn insert_product(&mut self, product: NewProduct) -> Result<Product>;

    async fn update_product(&mut self, product: &Product) -> Result<Product>;

    async fn delete_product(&mut self, id: ProductId) -> Result<bool>;
}

#[async_trait]
pub trait CommentRepository {
    async fn find_comment(&mut self, id: CommentId) -> Result<Option<Comment>>;

    async fn page_comments(&mut self, request: PageRequest) -> Result<Page<Comment>>;

    async fn page_comments_by_user(
        &mut self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Page<Comment>>;

    async fn page_comments_by_product(
        &mut self,
        product: ProductId,
        status: CommentStatus,
        request: PageRequest,
    ) -> Result<Page<Comment>>;

    async fn insert_comment(&mut self, comment: NewComment) -> Result<Comment>;

    async fn update_comment(&mut self, comment: &Comment) -> Result<Comment>;

    async fn delete_comment(&mut self, id: CommentId) -> Result<bool>;
}

#[async_trait]
pub trait CartRepository {
    /// Loads a cart together with its line items.
    async fn find_cart(&mut self, id: CartId) -> Result<Option<Cart>>;

    /// Loads the most recent cart of `user` whose status is one of `statuses`.
    async fn find_cart_by_user(
        &mut self,
        user: UserId,
        statuses: &[CartStatus],
    ) -> Result<Option<Cart>>;

    async fn insert_cart(&mut self, cart: NewCart) -> Result<Cart>;

    /// Overwrites status and line items of a stored cart.
    async fn update_cart(&mut self, cart: &Cart) -> Result<Cart>;

    /// Removes the cart and its line items.
    async fn delete_cart(&mut self, id: CartId) -> Result<bool>;
}

#[async_trait]
pub trait OrderRepository {
    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    async fn find_order_by_user_and_status(
        &mut self,
        user: UserId,
        status: OrderStatus,
    ) -> Result<Option<Order>>;

    async fn page_orders_by_user(
        &mut self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Page<Order>>;

    /// Stores a new order.
    ///
    /// Fails with a violation of [`crate::ONE_OPEN_ORDER_PER_USER`] if the
    /// order is OPEN and the user already has an OPEN order.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order>;

    async fn update_order(&mut self, order: &Order) -> Result<Order>;

    async fn delete_order(&mut self, id: OrderId) -> Result<bool>;
}
