//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Store connectivity
//!
//! # Accounts
//! POST   /users/signup                - Create account, issue tokens
//! POST   /users/login                 - Authenticate, issue tokens
//! POST   /users/refresh               - Rotate tokens
//!
//! # Catalog
//! POST   /admin/addproduct            - Create product (x-admin-key if configured)
//! GET    /users/productview           - List products
//! GET    /users/product?id=           - One product
//! GET    /users/search?name=          - Substring search
//!
//! # Cart and checkout (token header)
//! GET    /addtocart?id=&userId=       - Add product to cart
//! GET    /removeitem?id=&userId=      - Remove every line for a product
//! GET    /listcart?id=                - Cart lines and total
//! GET    /cartcheckout?userId=        - Checkout whole cart
//! GET    /instantbuy?id=&userId=      - Buy one product directly
//!
//! # Addresses (token header)
//! GET    /addresses?id=               - List addresses
//! POST   /addresses?id=               - Add address
//! PUT    /addresses/home?id=          - Edit slot 0
//! PUT    /addresses/work?id=          - Edit slot 1
//! DELETE /addresses/all?id=           - Remove every address
//! DELETE /addresses/{addressId}?id=   - Remove one address
//! ```
//!
//! Token-protected routes also require the `userId`/`id` query parameter to
//! name the authenticated user.

pub mod addresses;
pub mod cart;
pub mod products;
pub mod users;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};

use bazaar_core::IdError;

use crate::error::AppError;
use crate::state::AppState;

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `?id=<user or product>`
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// Parse a required ID from a query parameter.
///
/// A missing parameter is reported the same way as an empty one.
pub(crate) fn required_id<T>(value: Option<&str>) -> Result<T, AppError>
where
    T: FromStr<Err = IdError>,
{
    Ok(value.unwrap_or_default().parse::<T>()?)
}

/// Run a service call with a deadline.
///
/// # Errors
///
/// Returns `AppError::Timeout` if `limit` elapses first, or the call's own
/// error converted into an `AppError`.
pub(crate) async fn with_deadline<T, E, F>(limit: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, E>>,
    AppError: From<E>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => {
            tracing::warn!(limit_ms = limit.as_millis(), "deadline exceeded");
            Err(AppError::Timeout)
        }
    }
}

/// Create the account routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(users::signup))
        .route("/login", post(users::login))
        .route("/refresh", post(users::refresh))
        .route("/productview", get(products::index))
        .route("/product", get(products::show))
        .route("/search", get(products::search))
}

/// Create the admin routes router.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/addproduct", post(products::create))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_admin_key,
        ))
}

/// Create the cart and checkout routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/addtocart", get(cart::add))
        .route("/removeitem", get(cart::remove))
        .route("/listcart", get(cart::list))
        .route("/cartcheckout", get(cart::checkout))
        .route("/instantbuy", get(cart::instant_buy))
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index).post(addresses::create))
        .route("/home", put(addresses::edit_home))
        .route("/work", put(addresses::edit_work))
        .route("/all", delete(addresses::clear))
        .route("/{address_id}", delete(addresses::remove))
}

/// Create all API routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(cart_routes())
        .nest("/addresses", address_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_token,
        ));

    Router::new()
        .nest("/users", user_routes())
        .nest("/admin", admin_routes(state))
        .merge(protected)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::UserId;

    #[test]
    fn test_required_id() {
        let id = UserId::generate();
        let parsed: UserId = required_id(Some(&id.to_string())).unwrap();
        assert_eq!(parsed, id);

        assert!(matches!(
            required_id::<UserId>(None),
            Err(AppError::InvalidIdentifier(IdError::Empty { .. }))
        ));
        assert!(matches!(
            required_id::<UserId>(Some("42")),
            Err(AppError::InvalidIdentifier(IdError::Malformed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), AppError>(())
        };
        let result = with_deadline(Duration::from_millis(10), slow).await;
        assert!(matches!(result, Err(AppError::Timeout)));
    }
}
