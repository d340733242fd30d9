//! Integration tests for Bazaar.
//!
//! Every HTTP test starts its own server on an ephemeral port, backed by a
//! fresh in-memory store, and talks to it over real HTTP. The `pg_store`
//! tests run the `PostgreSQL` store directly and are ignored unless a
//! database is available.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! BAZAAR_DATABASE_URL=postgres://localhost/bazaar_test \
//!     cargo test -p bazaar-integration-tests --test pg_store -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `accounts` - Signup, login and token refresh
//! - `catalog` - Admin product creation, listing and search
//! - `cart` - Cart edits and ownership checks
//! - `checkout` - Cart checkout and instant buy
//! - `addresses` - Address book limits and slot edits
//! - `pg_store` - `PostgreSQL` store queries (needs a database)

use std::net::SocketAddr;
use std::sync::Arc;

use bazaar_server::config::ServerConfig;
use bazaar_server::db::{MemoryStore, ProductStore, UserStore};
use bazaar_server::state::AppState;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};

/// Admin key configured on every test server.
pub const ADMIN_KEY: &str = "integration-admin-key";

/// High-entropy token secret accepted by config validation.
const TOKEN_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// A running test server.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

/// A signed-up user and their tokens.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub token: String,
    pub refresh_token: String,
}

impl TestContext {
    /// Start a server with default settings.
    pub async fn new() -> Self {
        Self::with_env(&[]).await
    }

    /// Start a server with extra configuration variables.
    pub async fn with_env(overrides: &[(&str, &str)]) -> Self {
        let lookup = |key: &str| -> Option<String> {
            if let Some((_, value)) = overrides.iter().find(|(k, _)| *k == key) {
                return Some((*value).to_string());
            }
            match key {
                "BAZAAR_STORE" => Some("memory".to_string()),
                "BAZAAR_TOKEN_SECRET" => Some(TOKEN_SECRET.to_string()),
                "BAZAAR_ADMIN_KEY" => Some(ADMIN_KEY.to_string()),
                _ => None,
            }
        };
        let config = ServerConfig::from_lookup(&lookup).expect("test configuration is valid");

        let store = Arc::new(MemoryStore::new());
        let users: Arc<dyn UserStore> = store.clone();
        let products: Arc<dyn ProductStore> = store;
        let app = bazaar_server::app(AppState::new(config, users, products));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr: SocketAddr = listener.local_addr().expect("listener has an address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server failed");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path` with the user's token.
    #[must_use]
    pub fn get_as(&self, user: &TestUser, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).header("token", &user.token)
    }

    /// Create a product through the admin route and return its JSON.
    pub async fn add_product(&self, name: &str, price: u64) -> Value {
        let resp = self
            .client
            .post(self.url("/admin/addproduct"))
            .header("x-admin-key", ADMIN_KEY)
            .json(&json!({ "productName": name, "price": price, "rating": 4 }))
            .send()
            .await
            .expect("Failed to add product");

        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.expect("product JSON")
    }

    /// Sign up a user with the given email and phone.
    pub async fn signup(&self, email: &str, phone: &str) -> TestUser {
        let resp = self
            .client
            .post(self.url("/users/signup"))
            .json(&json!({
                "firstName": "Test",
                "lastName": "Shopper",
                "email": email,
                "phone": phone,
                "password": "hunter22",
            }))
            .send()
            .await
            .expect("Failed to sign up");

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.expect("session JSON");
        TestUser {
            id: field(&body, &["user", "userId"]),
            token: field(&body, &["token"]),
            refresh_token: field(&body, &["refreshToken"]),
        }
    }

    /// Sign up a user with default contact details.
    pub async fn default_user(&self) -> TestUser {
        self.signup("shopper@example.com", "+1 555 010 0001").await
    }
}

/// Read a string at a nested JSON path.
///
/// # Panics
///
/// Panics if the path does not lead to a string.
#[must_use]
pub fn field(body: &Value, path: &[&str]) -> String {
    path.iter()
        .fold(body, |value, key| &value[*key])
        .as_str()
        .unwrap_or_else(|| panic!("missing string at {path:?} in {body}"))
        .to_string()
}
