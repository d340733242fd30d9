//! Document store access.
//!
//! # Collections
//!
//! - `users` - One record per account. The cart, address book and order
//!   history are embedded in the record as JSONB documents, so a single-row
//!   update is atomic across all three.
//! - `products` - Flat catalog.
//!
//! # Implementations
//!
//! - [`PgStore`] - `PostgreSQL` (`bazaar` schema), used in production
//! - [`MemoryStore`] - process-local maps, used by tests and `BAZAAR_STORE=memory`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod memory;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{
    Address, AddressFields, AddressId, AddressSlot, CartItem, Email, Order, PhoneNumber, Price,
    Product, ProductId, UserId,
};

use crate::models::{NewUser, TokenHashes, User};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Result of a conditional write against one user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The record was found and changed.
    Applied,
    /// The record exists but the write's condition did not hold, so nothing
    /// changed. Each method documents what the condition is.
    Unchanged,
    /// No record has the given ID.
    UserMissing,
}

/// How an order is written to a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderWrite {
    /// Append the order and empty the cart, only if the record is still at
    /// `expected_version`.
    Checkout {
        /// Version observed when the cart snapshot was taken.
        expected_version: i64,
    },
    /// Append the order and leave the cart alone.
    Instant,
}

/// Access to the users collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Insert a user with an empty cart, address book and order history.
    ///
    /// Returns `RepositoryError::Conflict` if the email or phone is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Whether any user has this email.
    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError>;

    /// Whether any user has this phone number.
    async fn phone_exists(&self, phone: &PhoneNumber) -> Result<bool, RepositoryError>;

    /// Fetch a user record.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch a user and their password hash by email.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Replace the user's token hashes.
    async fn set_tokens(&self, id: UserId, tokens: &TokenHashes)
    -> Result<WriteOutcome, RepositoryError>;

    /// Resolve an unexpired access token hash to its user.
    async fn find_by_access_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError>;

    /// Resolve an unexpired refresh token hash to its user.
    async fn find_by_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError>;

    /// Append an item to the end of the cart.
    async fn push_cart_item(
        &self,
        id: UserId,
        item: &CartItem,
    ) -> Result<WriteOutcome, RepositoryError>;

    /// Remove every cart item for `product_id`.
    ///
    /// `Unchanged` means the cart held no such item.
    async fn pull_cart_items(
        &self,
        id: UserId,
        product_id: ProductId,
    ) -> Result<WriteOutcome, RepositoryError>;

    /// Sum of cart item prices, computed by the store by flattening the cart
    /// and grouping it back per user. `None` if the user does not exist.
    async fn cart_total(&self, id: UserId) -> Result<Option<Price>, RepositoryError>;

    /// Append an order as described by `write`.
    ///
    /// `Unchanged` means an `OrderWrite::Checkout` version check failed.
    async fn commit_order(
        &self,
        id: UserId,
        order: &Order,
        write: OrderWrite,
    ) -> Result<WriteOutcome, RepositoryError>;

    /// Number of stored addresses, counted by flattening the address list
    /// and grouping it back per user. `None` if the user does not exist.
    async fn address_count(&self, id: UserId) -> Result<Option<usize>, RepositoryError>;

    /// Append an address if fewer than `limit` are stored.
    ///
    /// `Unchanged` means the limit was already reached.
    async fn push_address(
        &self,
        id: UserId,
        address: &Address,
        limit: usize,
    ) -> Result<WriteOutcome, RepositoryError>;

    /// Overwrite the fields of the address at `slot`.
    ///
    /// `Unchanged` means the slot is empty.
    async fn set_address_slot(
        &self,
        id: UserId,
        slot: AddressSlot,
        fields: &AddressFields,
    ) -> Result<WriteOutcome, RepositoryError>;

    /// Remove every address.
    async fn clear_addresses(&self, id: UserId) -> Result<WriteOutcome, RepositoryError>;

    /// Remove the address with `address_id`.
    ///
    /// `Unchanged` means no such address is stored.
    async fn remove_address(
        &self,
        id: UserId,
        address_id: AddressId,
    ) -> Result<WriteOutcome, RepositoryError>;
}

/// Access to the products collection.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a product.
    async fn insert_product(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Fetch a product by ID.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// All products, ordered by name.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Products whose name contains `needle`, ignoring case, ordered by name.
    async fn search_products(&self, needle: &str) -> Result<Vec<Product>, RepositoryError>;
}

/// `PostgreSQL`-backed store implementing both collections.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
