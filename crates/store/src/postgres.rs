use std::collections::BTreeSet;

use async_trait::async_trait;
use common::{
    Authority, Cart, CartId, CartStatus, Category, CategoryId, Comment, CommentId, CommentStatus,
    Discount, LineItem, NewCart, NewCategory, NewComment, NewOrder, NewProduct, NewUser, Order,
    OrderId, OrderStatus, Page, PageRequest, Product, ProductId, ProductStatus, User, UserId,
    UserStatus,
};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::{
        CartRepository, CategoryRepository, CommentRepository, OrderRepository,
        ProductRepository, Store, Transaction, UserRepository,
    },
};

const USER_COLUMNS: &str =
    "id, username, password, email, name, family, status, authorities, created, changed";
const CATEGORY_COLUMNS: &str = "id, name, created, changed";
const PRODUCT_COLUMNS: &str =
    "id, name, category_id, description, price, product_type, status, created, changed";
const COMMENT_COLUMNS: &str = "id, user_id, product_id, text, rate, status, created, changed";
const CART_COLUMNS: &str = "id, user_id, status, created, changed";
const ORDER_COLUMNS: &str =
    "id, user_id, cart_id, price, discount_rate, discount_type, total, status, created, changed";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// A database transaction; sqlx rolls it back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn names(values: impl IntoIterator<Item = &'static str>) -> Vec<String> {
    values.into_iter().map(str::to_string).collect()
}

/// Maps unique-constraint violations to [`StoreError::UniqueViolation`].
fn write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
        && let Some(constraint) = db_err.constraint()
    {
        return StoreError::unique(constraint);
    }
    StoreError::Database(e)
}

fn row_to_user(row: &PgRow) -> Result<User> {
    let status: String = row.try_get("status")?;
    let authorities: Vec<String> = row.try_get("authorities")?;
    let authorities = authorities
        .iter()
        .map(|a| a.parse::<Authority>())
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;

    Ok(User {
        id: UserId::new(row.try_get("id")?),
        username: row.try_get("username")?,
        password: row.try_get("password")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        family: row.try_get("family")?,
        status: status.parse()?,
        authorities,
        created: row.try_get("created")?,
        changed: row.try_get("changed")?,
    })
}

fn row_to_category(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        created: row.try_get("created")?,
        changed: row.try_get("changed")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    let product_type: String = row.try_get("product_type")?;
    let status: String = row.try_get("status")?;

    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        category: CategoryId::new(row.try_get("category_id")?),
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        product_type: product_type.parse()?,
        status: status.parse()?,
        created: row.try_get("created")?,
        changed: row.try_get("changed")?,
    })
}

fn row_to_comment(row: &PgRow) -> Result<Comment> {
    let rate: String = row.try_get("rate")?;
    let status: String = row.try_get("status")?;

    Ok(Comment {
        id: CommentId::new(row.try_get("id")?),
        user: UserId::new(row.try_get("user_id")?),
        product: ProductId::new(row.try_get("product_id")?),
        text: row.try_get("text")?,
        rate: rate.parse()?,
        status: status.parse()?,
        created: row.try_get("created")?,
        changed: row.try_get("changed")?,
    })
}

fn row_to_line_item(row: &PgRow) -> Result<LineItem> {
    let product_type: String = row.try_get("product_type")?;
    let quantity: i32 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| StoreError::Decode(format!("negative cart item quantity: {quantity}")))?;

    Ok(LineItem {
        product: ProductId::new(row.try_get("product_id")?),
        product_type: product_type.parse()?,
        quantity,
        price: row.try_get("price")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let discount_type: String = row.try_get("discount_type")?;
    let status: String = row.try_get("status")?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        user: UserId::new(row.try_get("user_id")?),
        cart: CartId::new(row.try_get("cart_id")?),
        price: row.try_get("price")?,
        discount: Discount::new(row.try_get("discount_rate")?, discount_type.parse()?),
        total: row.try_get("total")?,
        status: status.parse()?,
        created: row.try_get("created")?,
        changed: row.try_get("changed")?,
    })
}

impl PostgresTransaction {
    async fn count(&mut self, sql: &str, bind: Option<Vec<String>>) -> Result<u64> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        if let Some(values) = bind {
            query = query.bind(values);
        }
        let count = query.fetch_one(&mut *self.tx).await?;
        Ok(count.max(0) as u64)
    }

    async fn load_items(&mut self, cart: CartId) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, product_type, quantity, price
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(cart.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_line_item).collect()
    }

    async fn cart_from_row(&mut self, row: PgRow) -> Result<Cart> {
        let id = CartId::new(row.try_get("id")?);
        let status: String = row.try_get("status")?;
        let items = self.load_items(id).await?;

        Ok(Cart {
            id,
            user: UserId::new(row.try_get("user_id")?),
            status: status.parse()?,
            items,
            created: row.try_get("created")?,
            changed: row.try_get("changed")?,
        })
    }

    async fn store_items(&mut self, cart: CartId, items: &[LineItem]) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart.as_i64())
            .execute(&mut *self.tx)
            .await?;

        for (position, item) in items.iter().enumerate() {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| StoreError::Decode(format!("quantity too large: {}", item.quantity)))?;
            sqlx::query(
                r#"
                INSERT INTO cart_items (cart_id, position, product_id, product_type, quantity, price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(cart.as_i64())
            .bind(position as i32)
            .bind(item.product.as_i64())
            .bind(item.product_type.as_str())
            .bind(quantity)
            .bind(item.price)
            .execute(&mut *self.tx)
            .await
            .map_err(write_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn lock_user(&mut self, id: UserId) -> Result<()> {
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresTransaction {
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_user_with_status(
        &mut self,
        id: UserId,
        statuses: &[UserStatus],
    ) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND status = ANY($2)");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .bind(names(statuses.iter().map(UserStatus::as_str)))
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_user_by_username(
        &mut self,
        username: &str,
        statuses: &[UserStatus],
    ) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND status = ANY($2) ORDER BY id LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(username)
            .bind(names(statuses.iter().map(UserStatus::as_str)))
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_user_by_credentials(
        &mut self,
        username: &str,
        password: &str,
        statuses: &[UserStatus],
    ) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND password = $2 AND status = ANY($3) ORDER BY id LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(username)
            .bind(password)
            .bind(names(statuses.iter().map(UserStatus::as_str)))
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn page_users(
        &mut self,
        statuses: &[UserStatus],
        request: PageRequest,
    ) -> Result<Page<User>> {
        let statuses = names(statuses.iter().map(UserStatus::as_str));
        let total = self
            .count(
                "SELECT COUNT(*) FROM users WHERE status = ANY($1)",
                Some(statuses.clone()),
            )
            .await?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE status = ANY($1) ORDER BY id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(statuses)
            .bind(i64::from(request.size()))
            .bind(request.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await?;

        let items = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, request, total))
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (username, password, email, name, family, status, authorities)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.family)
            .bind(user.status.as_str())
            .bind(names(user.authorities.iter().map(Authority::as_str)))
            .fetch_one(&mut *self.tx)
            .await
            .map_err(write_error)?;
        row_to_user(&row)
    }

    async fn update_user(&mut self, user: &User) -> Result<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET username = $2, password = $3, email = $4, name = $5, family = $6,
                status = $7, authorities = $8, changed = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(user.id.as_i64())
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.family)
            .bind(user.status.as_str())
            .bind(names(user.authorities.iter().map(Authority::as_str)))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(write_error)?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(StoreError::RowNotFound {
                entity: "user",
                id: user.id.as_i64(),
            }),
        }
    }

    async fn delete_user(&mut self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CategoryRepository for PostgresTransaction {
    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_category).transpose()
    }

    async fn find_category_by_name(&mut self, name: &str) -> Result<Option<Category>> {
        let sql =
            format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = $1 ORDER BY id LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_category).transpose()
    }

    async fn page_categories(&mut self, request: PageRequest) -> Result<Page<Category>> {
        let total = self.count("SELECT COUNT(*) FROM categories", None).await?;
        let sql =
            format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id ASC LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(i64::from(request.size()))
            .bind(request.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await?;

        let items = rows.iter().map(row_to_category).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, request, total))
    }

    async fn insert_category(&mut self, category: NewCategory) -> Result<Category> {
        let sql = format!("INSERT INTO categories (name) VALUES ($1) RETURNING {CATEGORY_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(&category.name)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(write_error)?;
        row_to_category(&row)
    }

    async fn update_category(&mut self, category: &Category) -> Result<Category> {
        let sql = format!(
            "UPDATE categories SET name = $2, changed = NOW() WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(category.id.as_i64())
            .bind(&category.name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(write_error)?;

        match row {
            Some(row) => row_to_category(&row),
            None => Err(StoreError::RowNotFound {
                entity: "category",
                id: category.id.as_i64(),
            }),
        }
    }

    async fn delete_category(&mut self, id: CategoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductRepository for PostgresTransaction {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_product_with_status(
        &mut self,
        id: ProductId,
        statuses: &[ProductStatus],
    ) -> Result<Option<Product>> {
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND status = ANY($2)");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .bind(names(statuses.iter().map(ProductStatus::as_str)))
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_product_by_name(
        &mut self,
        name: &str,
        statuses: &[ProductStatus],
    ) -> Result<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE name = $1 AND status = ANY($2) ORDER BY id LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .bind(names(statuses.iter().map(ProductStatus::as_str)))
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn page_products(
        &mut self,
        statuses: &[ProductStatus],
        request: PageRequest,
    ) -> Result<Page<Product>> {
        let statuses = names(statuses.iter().map(ProductStatus::as_str));
        let total = self
            .count(
                "SELECT COUNT(*) FROM products WHERE status = ANY($1)",
                Some(statuses.clone()),
            )
            .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE status = ANY($1) ORDER BY id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(statuses)
            .bind(i64::from(request.size()))
            .bind(request.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await?;

        let items = rows.iter().map(row_to_product).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, request, total))
    }

    async fn search_products(&mut self, text: &str) -> Result<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE name ILIKE $1 OR description ILIKE $1 OR price::text ILIKE $1
            ORDER BY created DESC, id DESC
            "#
        );
        let pattern = format!("%{}%", text.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query(&sql)
            .bind(pattern)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn insert_product(&mut self, product: NewProduct) -> Result<Product> {
        let sql = format!(
            r#"
            INSERT INTO products (name, category_id, description, price, product_type, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&product.name)
            .bind(product.category.as_i64())
            .bind(&product.description)
            .bind(product.price)
            .bind(product.product_type.as_str())
            .bind(product.status.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(write_error)?;
        row_to_product(&row)
    }

    async fn update_product(&mut self, product: &Product) -> Result<Product> {
        let sql = format!(
            r#"
            UPDATE products
            SET name = $2, category_id = $3, description = $4, price = $5,
                product_type = $6, status = $7, changed = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(product.id.as_i64())
            .bind(&product.name)
            .bind(product.category.as_i64())
            .bind(&product.description)
            .bind(product.price)
            .bind(product.product_type.as_str())
            .bind(product.status.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(write_error)?;

        match row {
            Some(row) => row_to_product(&row),
            None => Err(StoreError::RowNotFound {
                entity: "product",
                id: product.id.as_i64(),
            }),
        }
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CommentRepository for PostgresTransaction {
    async fn find_comment(&mut self, id: CommentId) -> Result<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_comment).transpose()
    }

    async fn page_comments(&mut self, request: PageRequest) -> Result<Page<Comment>> {
        let total = self.count("SELECT COUNT(*) FROM comments", None).await?;
        let sql =
            format!("SELECT {COMMENT_COLUMNS} FROM comments ORDER BY id ASC LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(i64::from(request.size()))
            .bind(request.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await?;

        let items = rows.iter().map(row_to_comment).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, request, total))
    }

    async fn page_comments_by_user(
        &mut self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Page<Comment>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE user_id = $1")
            .bind(user.as_i64())
            .fetch_one(&mut *self.tx)
            .await?;

        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE user_id = $1 ORDER BY id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(user.as_i64())
            .bind(i64::from(request.size()))
            .bind(request.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await?;

        let items = rows.iter().map(row_to_comment).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, request, total.max(0) as u64))
    }

    async fn page_comments_by_product(
        &mut self,
        product: ProductId,
        status: CommentStatus,
        request: PageRequest,
    ) -> Result<Page<Comment>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE product_id = $1 AND status = $2",
        )
        .bind(product.as_i64())
        .bind(status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE product_id = $1 AND status = $2 ORDER BY id ASC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(product.as_i64())
            .bind(status.as_str())
            .bind(i64::from(request.size()))
            .bind(request.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await?;

        let items = rows.iter().map(row_to_comment).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, request, total.max(0) as u64))
    }

    async fn insert_comment(&mut self, comment: NewComment) -> Result<Comment> {
        let sql = format!(
            r#"
            INSERT INTO comments (user_id, product_id, text, rate, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(comment.user.as_i64())
            .bind(comment.product.as_i64())
            .bind(&comment.text)
            .bind(comment.rate.as_str())
            .bind(comment.status.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(write_error)?;
        row_to_comment(&row)
    }

    async fn update_comment(&mut self, comment: &Comment) -> Result<Comment> {
        let sql = format!(
            r#"
            UPDATE comments
            SET text = $2, rate = $3, status = $4, changed = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(comment.id.as_i64())
            .bind(&comment.text)
            .bind(comment.rate.as_str())
            .bind(comment.status.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(write_error)?;

        match row {
            Some(row) => row_to_comment(&row),
            None => Err(StoreError::RowNotFound {
                entity: "comment",
                id: comment.id.as_i64(),
            }),
        }
    }

    async fn delete_comment(&mut self, id: CommentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CartRepository for PostgresTransaction {
    async fn find_cart(&mut self, id: CartId) -> Result<Option<Cart>> {
        let sql = format!("SELECT {CART_COLUMNS} FROM carts WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(Some(self.cart_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_cart_by_user(
        &mut self,
        user: UserId,
        statuses: &[CartStatus],
    ) -> Result<Option<Cart>> {
        let sql = format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 AND status = ANY($2) ORDER BY id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(user.as_i64())
            .bind(names(statuses.iter().map(CartStatus::as_str)))
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(Some(self.cart_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn insert_cart(&mut self, cart: NewCart) -> Result<Cart> {
        let sql =
            format!("INSERT INTO carts (user_id, status) VALUES ($1, $2) RETURNING {CART_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(cart.user.as_i64())
            .bind(cart.status.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(write_error)?;

        let id = CartId::new(row.try_get("id")?);
        self.store_items(id, &cart.items).await?;
        self.cart_from_row(row).await
    }

    async fn update_cart(&mut self, cart: &Cart) -> Result<Cart> {
        let sql = format!(
            "UPDATE carts SET status = $2, changed = NOW() WHERE id = $1 RETURNING {CART_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(cart.id.as_i64())
            .bind(cart.status.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(write_error)?;

        let Some(row) = row else {
            return Err(StoreError::RowNotFound {
                entity: "cart",
                id: cart.id.as_i64(),
            });
        };
        self.store_items(cart.id, &cart.items).await?;
        self.cart_from_row(row).await
    }

    async fn delete_cart(&mut self, id: CartId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for PostgresTransaction {
    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn find_order_by_user_and_status(
        &mut self,
        user: UserId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND status = $2 ORDER BY id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(user.as_i64())
            .bind(status.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn page_orders_by_user(
        &mut self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Page<Order>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user.as_i64())
            .fetch_one(&mut *self.tx)
            .await?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(user.as_i64())
            .bind(i64::from(request.size()))
            .bind(request.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await?;

        let items = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, request, total.max(0) as u64))
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        let sql = format!(
            r#"
            INSERT INTO orders (user_id, cart_id, price, discount_rate, discount_type, total, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(order.user.as_i64())
            .bind(order.cart.as_i64())
            .bind(order.price)
            .bind(order.discount.rate)
            .bind(order.discount.discount_type.as_str())
            .bind(order.total)
            .bind(order.status.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(write_error)?;
        row_to_order(&row)
    }

    async fn update_order(&mut self, order: &Order) -> Result<Order> {
        let sql = format!(
            r#"
            UPDATE orders
            SET price = $2, discount_rate = $3, discount_type = $4, total = $5,
                status = $6, changed = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(order.id.as_i64())
            .bind(order.price)
            .bind(order.discount.rate)
            .bind(order.discount.discount_type.as_str())
            .bind(order.total)
            .bind(order.status.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(write_error)?;

        match row {
            Some(row) => row_to_order(&row),
            None => Err(StoreError::RowNotFound {
                entity: "order",
                id: order.id.as_i64(),
            }),
        }
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
