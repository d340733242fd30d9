//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Token / admin key checks (per route group)

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::{RequireAuth, require_admin_key, require_token};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
