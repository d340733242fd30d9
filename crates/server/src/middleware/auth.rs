//! Authentication middleware and extractors.
//!
//! Protected routes run [`require_token`], which resolves the `token` header to
//! a [`CurrentUser`] and stores it in the request extensions. Handlers pick it
//! up with the [`RequireAuth`] extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use bazaar_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Header carrying the access token.
pub const TOKEN_HEADER: &str = "token";

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Middleware that rejects requests without a valid access token.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the header is missing, or
/// `AppError::Auth` if the token is unknown or expired.
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("no authorization header provided".to_string()))?;

    let id = state.auth().authenticate(token).await?;

    tracing::Span::current().record("user_id", tracing::field::display(id));
    set_sentry_user(&id);

    request.extensions_mut().insert(CurrentUser { id });
    Ok(next.run(request).await)
}

/// Middleware guarding admin routes with `BAZAAR_ADMIN_KEY`.
///
/// When no key is configured the routes are open.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if a key is configured and the header
/// does not match it.
pub async fn require_admin_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = &state.config().admin_key {
        let provided = request
            .headers()
            .get(ADMIN_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        if !constant_time_compare(provided, expected.expose_secret()) {
            tracing::warn!("rejected admin request with bad key");
            return Err(AppError::Unauthorized("invalid admin key".to_string()));
        }
    }

    Ok(next.run(request).await)
}

/// Extractor that requires an authenticated user.
///
/// Only works behind [`require_token`].
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl RequireAuth {
    /// Check that a client-supplied user ID names the caller.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if it names someone else.
    pub fn ensure_self(&self, requested: UserId) -> Result<UserId, AppError> {
        if requested == self.0.id {
            Ok(requested)
        } else {
            Err(AppError::Forbidden(
                "cannot act on another user's account".to_string(),
            ))
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_ensure_self() {
        let me = UserId::generate();
        let auth = RequireAuth(CurrentUser { id: me });
        assert_eq!(auth.ensure_self(me).ok(), Some(me));
        assert!(matches!(
            auth.ensure_self(UserId::generate()),
            Err(AppError::Forbidden(_))
        ));
    }
}
