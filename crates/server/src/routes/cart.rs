//! Cart and checkout route handlers.
//!
//! All handlers sit behind the token middleware and only act on the caller's
//! own account.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{Order, ProductId, UserId};

use super::{IdQuery, Message, required_id, with_deadline};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::cart::CartView;
use crate::state::AppState;

/// `?id=<product>&userId=<user>`
#[derive(Debug, Deserialize)]
pub struct ProductUserQuery {
    pub id: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// `?userId=<user>`
#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl ProductUserQuery {
    fn ids(&self, auth: &RequireAuth) -> Result<(ProductId, UserId)> {
        let product_id = required_id(self.id.as_deref())?;
        let user_id = auth.ensure_self(required_id(self.user_id.as_deref())?)?;
        Ok((product_id, user_id))
    }
}

/// Add a product to the caller's cart.
#[instrument(skip(state, auth))]
pub async fn add(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<ProductUserQuery>, QueryRejection>,
) -> Result<Json<Message>> {
    let Query(query) = query?;
    let (product_id, user_id) = query.ids(&auth)?;

    with_deadline(
        state.config().cart_timeout,
        state.cart().add_to_cart(product_id, user_id),
    )
    .await?;

    Ok(Json(Message::new("Successfully added to cart")))
}

/// Remove every line for a product from the caller's cart.
#[instrument(skip(state, auth))]
pub async fn remove(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<ProductUserQuery>, QueryRejection>,
) -> Result<Json<Message>> {
    let Query(query) = query?;
    let (product_id, user_id) = query.ids(&auth)?;

    let removed = with_deadline(
        state.config().cart_timeout,
        state.cart().remove_item(product_id, user_id),
    )
    .await?;

    let message = if removed {
        "Successfully removed product from cart"
    } else {
        "Product was not in the cart"
    };
    Ok(Json(Message::new(message)))
}

/// The caller's cart and its total.
#[instrument(skip(state, auth))]
pub async fn list(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<CartView>> {
    let Query(query) = query?;
    let user_id = auth.ensure_self(required_id(query.id.as_deref())?)?;

    let view = with_deadline(
        state.config().checkout_timeout,
        state.cart().view_cart(user_id),
    )
    .await?;

    Ok(Json(view))
}

/// Check out the caller's whole cart.
#[instrument(skip(state, auth))]
pub async fn checkout(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<CheckoutQuery>, QueryRejection>,
) -> Result<Json<Order>> {
    let Query(query) = query?;
    let user_id = auth.ensure_self(required_id(query.user_id.as_deref())?)?;

    let order = with_deadline(
        state.config().checkout_timeout,
        state.checkout().buy_from_cart(user_id),
    )
    .await?;

    Ok(Json(order))
}

/// Buy a single product without touching the cart.
#[instrument(skip(state, auth))]
pub async fn instant_buy(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<ProductUserQuery>, QueryRejection>,
) -> Result<Json<Order>> {
    let Query(query) = query?;
    let (product_id, user_id) = query.ids(&auth)?;

    let order = with_deadline(
        state.config().cart_timeout,
        state.checkout().instant_buy(product_id, user_id),
    )
    .await?;

    Ok(Json(order))
}
