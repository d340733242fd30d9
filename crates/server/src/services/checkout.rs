//! Turning carts and single products into orders.
//!
//! # Cart checkout
//!
//! 1. Read the user record once: the cart and its `version`.
//! 2. Build the order from that snapshot (line items, exact integer total,
//!    cash on delivery).
//! 3. Append the order and empty the cart in one conditional write that only
//!    applies if `version` is unchanged.
//!
//! If anything touched the record between 1 and 3, nothing is written and the
//! caller gets [`CheckoutError::ConcurrentModification`]. Orders are never
//! built half-way or left without their line items.
//!
//! # Instant buy
//!
//! One product, one order, appended in a single write. The cart is untouched.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{CartItem, Order, OrderError, ProductId, UserId};

use crate::db::{OrderWrite, ProductStore, RepositoryError, UserStore, WriteOutcome};

/// Errors from checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No user with the given ID.
    #[error("user not found")]
    UserNotFound,

    /// No product with the given ID.
    #[error("product not found")]
    ProductNotFound,

    /// The cart changed while the order was being placed.
    #[error("cart was modified during checkout, please retry")]
    ConcurrentModification,

    /// The order could not be written.
    #[error("could not record the order")]
    UserUpdateFailed,

    /// The order could not be built.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Places orders.
pub struct CheckoutService<'a> {
    users: &'a dyn UserStore,
    products: &'a dyn ProductStore,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, products: &'a dyn ProductStore) -> Self {
        Self { users, products }
    }

    /// Turn the user's whole cart into an order and empty the cart.
    ///
    /// An empty cart produces an order with no lines and a zero total.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::UserNotFound` if the user does not exist.
    /// Returns `CheckoutError::ConcurrentModification` if the user record was
    /// written between reading the cart and committing the order.
    #[instrument(skip(self))]
    pub async fn buy_from_cart(&self, user_id: UserId) -> Result<Order, CheckoutError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(CheckoutError::UserNotFound)?;

        let order = Order::from_items(user.cart, Utc::now())?;
        let write = OrderWrite::Checkout {
            expected_version: user.version,
        };

        match self.users.commit_order(user_id, &order, write).await? {
            WriteOutcome::Applied => {
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total_price,
                    lines = order.items.len(),
                    "cart checked out"
                );
                Ok(order)
            }
            WriteOutcome::Unchanged => {
                tracing::warn!("cart changed during checkout");
                Err(CheckoutError::ConcurrentModification)
            }
            WriteOutcome::UserMissing => Err(CheckoutError::UserUpdateFailed),
        }
    }

    /// Order a single product directly, bypassing the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::ProductNotFound` if the product does not exist.
    /// Returns `CheckoutError::UserUpdateFailed` if the user record was not updated.
    #[instrument(skip(self))]
    pub async fn instant_buy(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<Order, CheckoutError> {
        let product = self
            .products
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound)?;

        let order = Order::from_items(vec![CartItem::from(&product)], Utc::now())?;

        match self
            .users
            .commit_order(user_id, &order, OrderWrite::Instant)
            .await?
        {
            WriteOutcome::Applied => {
                tracing::info!(order_id = %order.id, total = %order.total_price, "instant buy");
                Ok(order)
            }
            WriteOutcome::Unchanged | WriteOutcome::UserMissing => {
                Err(CheckoutError::UserUpdateFailed)
            }
        }
    }
}
