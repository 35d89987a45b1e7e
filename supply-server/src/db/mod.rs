//! Store layer
//!
//! Services talk to persistence through the traits below. Two backends
//! implement them:
//!
//! - [`pg::PgStore`]: PostgreSQL via sqlx
//! - [`memory::MemoryStore`]: process-local maps, used by tests and
//!   `DATABASE_URL=memory://`
//!
//! Order placement and status changes run inside an [`OrderTx`], which
//! holds row locks on the touched products until it is committed or dropped.
//! Dropping an uncommitted transaction rolls it back.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    AuditLog, Category, CategoryCreate, CategoryUpdate, Institution, InstitutionCreate,
    InstitutionUpdate, OrderDto, OrderStatus, Product, ProductCreate, ProductUpdate, Role, User,
};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found")]
    NotFound,

    /// Unique constraint violated; carries the offending field
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Row is still referenced by a foreign key
    #[error("In use: {0}")]
    InUse(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// New user row (password already hashed, email already normalized)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub institution_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: i64,
}

/// Replacement values for a user row; `password_hash = None` keeps the hash
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub institution_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: Option<String>,
}

/// Stored reset token; only the SHA-256 digest of the token is kept
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: i64,
    pub created_at: i64,
}

/// Persisted order line
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub product_id: i64,
    pub quantity: i32,
    /// Unit price snapshot
    pub price: Decimal,
}

/// Order about to be inserted
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub institution_id: i64,
    pub user_id: i64,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: i64,
    pub items: Vec<OrderItem>,
}

/// Order as stored, without the display joins of [`OrderDto`]
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: i64,
    pub institution_id: i64,
    pub user_id: i64,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: i64,
    pub items: Vec<OrderItem>,
}

/// Which orders a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    All,
    Institution(i64),
    User(i64),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn list_users_by_institution(&self, institution_id: i64) -> RepoResult<Vec<User>>;
    /// Fails with `Duplicate("email")` when the email is taken
    async fn insert_user(&self, user: NewUser) -> RepoResult<User>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> RepoResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> RepoResult<bool>;

    /// Store a new reset token for the user, dropping every earlier one
    async fn replace_reset_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: i64,
        created_at: i64,
    ) -> RepoResult<()>;
    async fn find_reset_token(&self, token_hash: &str) -> RepoResult<Option<PasswordResetToken>>;
    /// Delete the token and set the user's password hash atomically.
    ///
    /// Returns `false` when the token was already consumed.
    async fn consume_reset_token(&self, token_id: i64, password_hash: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait InstitutionStore: Send + Sync {
    async fn list_institutions(&self) -> RepoResult<Vec<Institution>>;
    async fn find_institution(&self, id: i64) -> RepoResult<Option<Institution>>;
    async fn insert_institution(&self, data: InstitutionCreate, now: i64)
    -> RepoResult<Institution>;
    async fn update_institution(
        &self,
        id: i64,
        data: InstitutionUpdate,
    ) -> RepoResult<Option<Institution>>;
    /// Fails with `InUse` while users or orders reference it
    async fn delete_institution(&self, id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Products with `category_name` filled in
    async fn list_products(&self) -> RepoResult<Vec<Product>>;
    async fn find_product(&self, id: i64) -> RepoResult<Option<Product>>;
    async fn insert_product(&self, data: ProductCreate) -> RepoResult<Product>;
    async fn update_product(&self, id: i64, data: ProductUpdate) -> RepoResult<Option<Product>>;
    /// Soft delete (`is_active = false`)
    async fn deactivate_product(&self, id: i64) -> RepoResult<bool>;
    async fn set_product_stock(&self, id: i64, stock: Option<i32>) -> RepoResult<Option<Product>>;

    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn find_category(&self, id: i64) -> RepoResult<Option<Category>>;
    async fn insert_category(&self, data: CategoryCreate) -> RepoResult<Category>;
    async fn update_category(&self, id: i64, data: CategoryUpdate)
    -> RepoResult<Option<Category>>;
    /// Fails with `InUse` while products reference it
    async fn delete_category(&self, id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn begin_order_tx(&self) -> RepoResult<Box<dyn OrderTx>>;
    async fn find_order(&self, id: i64) -> RepoResult<Option<OrderRecord>>;
    /// Materialized order, items in insertion order
    async fn order_view(&self, id: i64) -> RepoResult<Option<OrderDto>>;
    /// Materialized orders, newest first
    async fn list_order_views(&self, filter: OrderFilter) -> RepoResult<Vec<OrderDto>>;
}

/// Unit of work for order placement and status changes
#[async_trait]
pub trait OrderTx: Send {
    async fn institution_exists(&mut self, id: i64) -> RepoResult<bool>;
    async fn user_exists(&mut self, id: i64) -> RepoResult<bool>;
    /// Load and row-lock the given products (any order, locked by ascending id).
    /// Unknown ids are simply absent from the result.
    async fn lock_products(&mut self, ids: &[i64]) -> RepoResult<Vec<Product>>;
    async fn write_stock(&mut self, product_id: i64, stock: i32) -> RepoResult<()>;
    /// Insert order and items, returning the new order id
    async fn insert_order(&mut self, order: NewOrder) -> RepoResult<i64>;
    async fn lock_order(&mut self, id: i64) -> RepoResult<Option<OrderRecord>>;
    async fn write_order_status(&mut self, id: i64, status: OrderStatus) -> RepoResult<()>;
    async fn commit(self: Box<Self>) -> RepoResult<()>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(
        &self,
        user_id: Option<i64>,
        action: &str,
        details: &str,
        now: i64,
    ) -> RepoResult<()>;
    /// Most recent entries first
    async fn list_audit(&self, limit: i64) -> RepoResult<Vec<AuditLog>>;
}

/// Every store concern behind one object
pub trait Database: UserStore + InstitutionStore + CatalogStore + OrderStore + AuditStore {}

impl<T> Database for T where
    T: UserStore + InstitutionStore + CatalogStore + OrderStore + AuditStore
{
}
