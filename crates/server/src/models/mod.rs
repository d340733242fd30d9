//! Server-side domain models.
//!
//! Catalog and cart documents live in `bazaar_core`; this module adds the
//! user record, which carries authentication material that never leaves the
//! server.

pub mod user;

pub use user::{CurrentUser, NewUser, TokenHashes, User, UserProfile};
