//! Cart mutations.
//!
//! Adding copies a snapshot of the product into the cart; the catalog is never
//! consulted again for that line. The same product may appear several times.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{CartItem, NewProduct, Price, ProductId, UserId};

use crate::db::{ProductStore, RepositoryError, UserStore, WriteOutcome};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No product with the given ID.
    #[error("product not found")]
    ProductNotFound,

    /// No user with the given ID.
    #[error("user not found")]
    UserNotFound,

    /// Adding the item would push the cart total above the largest storable
    /// price.
    #[error("cart total cannot exceed {max}")]
    TotalTooLarge {
        /// Highest accepted cart total in minor units.
        max: Price,
    },

    /// The user record could not be updated.
    #[error("could not update the user's cart")]
    UserUpdateFailed,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart and its total.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total: Price,
}

/// Add, remove and list cart line items.
pub struct CartService<'a> {
    users: &'a dyn UserStore,
    products: &'a dyn ProductStore,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, products: &'a dyn ProductStore) -> Self {
        Self { users, products }
    }

    /// Append a snapshot of the product to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product does not exist.
    /// Returns `CartError::TotalTooLarge` if the cart total would exceed
    /// [`NewProduct::MAX_PRICE`].
    /// Returns `CartError::UserUpdateFailed` if the user record was not updated.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<CartItem, CartError> {
        let product = self
            .products
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        let total = self
            .users
            .cart_total(user_id)
            .await?
            .ok_or(CartError::UserUpdateFailed)?;
        if total
            .checked_add(product.price)
            .is_none_or(|t| t > NewProduct::MAX_PRICE)
        {
            return Err(CartError::TotalTooLarge {
                max: NewProduct::MAX_PRICE,
            });
        }

        let item = CartItem::from(&product);
        match self.users.push_cart_item(user_id, &item).await? {
            WriteOutcome::Applied => Ok(item),
            WriteOutcome::Unchanged | WriteOutcome::UserMissing => {
                Err(CartError::UserUpdateFailed)
            }
        }
    }

    /// Remove every line for `product_id` from the user's cart.
    ///
    /// Returns whether anything was removed; a product that is not in the
    /// cart is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CartError::UserUpdateFailed` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, CartError> {
        match self.users.pull_cart_items(user_id, product_id).await? {
            WriteOutcome::Applied => Ok(true),
            WriteOutcome::Unchanged => Ok(false),
            WriteOutcome::UserMissing => Err(CartError::UserUpdateFailed),
        }
    }

    /// The user's cart with its store-computed total.
    ///
    /// # Errors
    ///
    /// Returns `CartError::UserNotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn view_cart(&self, user_id: UserId) -> Result<CartView, CartError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(CartError::UserNotFound)?;
        let total = self
            .users
            .cart_total(user_id)
            .await?
            .ok_or(CartError::UserNotFound)?;

        Ok(CartView {
            items: user.cart,
            total,
        })
    }
}
