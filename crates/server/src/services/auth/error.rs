//! Authentication error types.

use thiserror::Error;

use bazaar_core::ContactError;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or phone number failed validation.
    #[error("{0}")]
    InvalidContact(#[from] ContactError),

    /// A first or last name is out of bounds.
    #[error("{0}")]
    InvalidName(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("login or password is incorrect")]
    InvalidCredentials,

    /// Token is unknown or expired.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Phone number already registered.
    #[error("phone number already in use")]
    PhoneInUse,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// The token secret cannot key an HMAC.
    #[error("token signing error")]
    TokenSigning,
}
