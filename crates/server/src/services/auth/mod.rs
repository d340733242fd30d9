//! Authentication service.
//!
//! Password accounts with opaque bearer tokens. A login issues an access token
//! and a refresh token; only their HMAC-SHA256 digests (keyed with
//! `BAZAAR_TOKEN_SECRET`) are stored, so a leaked users table cannot be
//! replayed against the API.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use tracing::instrument;

use bazaar_core::{Email, PhoneNumber, UserId};

use crate::db::{RepositoryError, UserStore, WriteOutcome};
use crate::models::{NewUser, TokenHashes, UserProfile};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Accepted name length, in characters.
const NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=30;

/// Random bytes per token before encoding.
const TOKEN_BYTES: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Validated signup form.
#[derive(Debug, Clone)]
pub struct Signup<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub password: &'a str,
}

/// A freshly issued token pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedTokens {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful signup or login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: IssuedTokens,
}

/// Token lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct TokenTtl {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access: Duration::hours(24),
            refresh: Duration::hours(168),
        }
    }
}

/// Authentication service.
///
/// Handles signup, login, token refresh and token validation.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    token_secret: &'a SecretString,
    ttl: TokenTtl,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, token_secret: &'a SecretString, ttl: TokenTtl) -> Self {
        Self {
            users,
            token_secret,
            ttl,
        }
    }

    /// Register a new user and log them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName`, `AuthError::InvalidContact` or
    /// `AuthError::WeakPassword` for bad input.
    /// Returns `AuthError::UserAlreadyExists` if the email is registered.
    /// Returns `AuthError::PhoneInUse` if the phone number is registered.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn signup(&self, form: Signup<'_>) -> Result<Session, AuthError> {
        let first_name = validate_name("first name", form.first_name)?;
        let last_name = validate_name("last name", form.last_name)?;
        let email = Email::parse(form.email)?;
        let phone = PhoneNumber::parse(form.phone)?;
        validate_password(form.password)?;

        if self.users.email_exists(&email).await? {
            return Err(AuthError::UserAlreadyExists);
        }
        if self.users.phone_exists(&phone).await? {
            return Err(AuthError::PhoneInUse);
        }

        let password_hash = hash_password(form.password)?;

        // The unique constraints still catch a concurrent signup that slipped
        // past the checks above.
        let user = self
            .users
            .create_user(NewUser {
                first_name,
                last_name,
                email,
                phone,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) if msg.contains("phone") => AuthError::PhoneInUse,
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let tokens = self.issue_tokens(user.id).await?;
        tracing::info!(user_id = %user.id, "user signed up");

        Ok(Session {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let tokens = self.issue_tokens(user.id).await?;

        Ok(Session {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The old pair stops working immediately.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the refresh token is unknown or expired.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens, AuthError> {
        let digest = self.digest(refresh_token)?;
        let user_id = self
            .users
            .find_by_refresh_token(&digest, Utc::now())
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.issue_tokens(user_id).await
    }

    /// Resolve an access token to the user it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is unknown or expired.
    pub async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let digest = self.digest(token)?;
        self.users
            .find_by_access_token(&digest, Utc::now())
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    async fn issue_tokens(&self, user_id: UserId) -> Result<IssuedTokens, AuthError> {
        let now = Utc::now();
        let token = generate_token();
        let refresh_token = generate_token();

        let hashes = TokenHashes {
            access_hash: self.digest(&token)?,
            access_expires_at: now + self.ttl.access,
            refresh_hash: self.digest(&refresh_token)?,
            refresh_expires_at: now + self.ttl.refresh,
        };

        match self.users.set_tokens(user_id, &hashes).await? {
            WriteOutcome::Applied => Ok(IssuedTokens {
                token,
                refresh_token,
                expires_at: hashes.access_expires_at,
            }),
            WriteOutcome::Unchanged | WriteOutcome::UserMissing => Err(AuthError::UserNotFound),
        }
    }

    fn digest(&self, token: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.token_secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::TokenSigning)?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Generate an opaque URL-safe token.
fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Trim a name and check its length.
fn validate_name(field: &str, value: &str) -> Result<String, AuthError> {
    let trimmed = value.trim();
    if !NAME_LENGTH.contains(&trimmed.chars().count()) {
        return Err(AuthError::InvalidName(format!(
            "{field} must be between {} and {} characters",
            NAME_LENGTH.start(),
            NAME_LENGTH.end()
        )));
    }
    Ok(trimmed.to_owned())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn secret() -> SecretString {
        SecretString::from("k7Qp2vX9mR4tW8zY1bN6cF3hJ5sL0aDe")
    }

    fn form<'a>(email: &'a str, phone: &'a str) -> Signup<'a> {
        Signup {
            first_name: "Ann",
            last_name: "Lee",
            email,
            phone,
            password: "hunter22",
        }
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let store = MemoryStore::new();
        let secret = secret();
        let auth = AuthService::new(&store, &secret, TokenTtl::default());

        let session = auth
            .signup(form("ann@example.com", "5550100"))
            .await
            .unwrap();
        assert_eq!(session.user.email.as_str(), "ann@example.com");

        let login = auth.login("ANN@example.com", "hunter22").await.unwrap();
        assert_eq!(login.user.user_id, session.user.user_id);
        assert_ne!(login.tokens.token, session.tokens.token);
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicate_email_and_phone() {
        let store = MemoryStore::new();
        let secret = secret();
        let auth = AuthService::new(&store, &secret, TokenTtl::default());
        auth.signup(form("ann@example.com", "5550100")).await.unwrap();

        let err = auth
            .signup(form("ann@example.com", "5550199"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));

        let err = auth
            .signup(form("bob@example.com", "555-0100"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PhoneInUse));
    }

    #[tokio::test]
    async fn test_signup_validates_input() {
        let store = MemoryStore::new();
        let secret = secret();
        let auth = AuthService::new(&store, &secret, TokenTtl::default());

        let mut short_name = form("ann@example.com", "5550100");
        short_name.first_name = "A";
        assert!(matches!(
            auth.signup(short_name).await,
            Err(AuthError::InvalidName(_))
        ));

        let mut weak = form("ann@example.com", "5550100");
        weak.password = "12345";
        assert!(matches!(
            auth.signup(weak).await,
            Err(AuthError::WeakPassword(_))
        ));

        assert!(matches!(
            auth.signup(form("not-an-email", "5550100")).await,
            Err(AuthError::InvalidContact(_))
        ));
    }

    #[tokio::test]
    async fn test_login_wrong_password_matches_unknown_email() {
        let store = MemoryStore::new();
        let secret = secret();
        let auth = AuthService::new(&store, &secret, TokenTtl::default());
        auth.signup(form("ann@example.com", "5550100")).await.unwrap();

        assert!(matches!(
            auth.login("ann@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "hunter22").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_and_refresh() {
        let store = MemoryStore::new();
        let secret = secret();
        let auth = AuthService::new(&store, &secret, TokenTtl::default());
        let session = auth.signup(form("ann@example.com", "5550100")).await.unwrap();

        let id = auth.authenticate(&session.tokens.token).await.unwrap();
        assert_eq!(id, session.user.user_id);

        let rotated = auth.refresh(&session.tokens.refresh_token).await.unwrap();
        assert_eq!(auth.authenticate(&rotated.token).await.unwrap(), id);
        assert!(matches!(
            auth.authenticate(&session.tokens.token).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            auth.refresh(&session.tokens.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let store = MemoryStore::new();
        let secret = secret();
        let ttl = TokenTtl {
            access: Duration::seconds(-1),
            refresh: Duration::hours(1),
        };
        let auth = AuthService::new(&store, &secret, ttl);
        let session = auth.signup(form("ann@example.com", "5550100")).await.unwrap();

        assert!(matches!(
            auth.authenticate(&session.tokens.token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
