//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Signup, login and bearer tokens
//! - `catalog` - Product lookups and admin product creation
//! - `cart` - Cart line items
//! - `checkout` - Cart checkout and instant buy
//! - `address` - Home/work address book
//!
//! Services borrow the stores from [`AppState`](crate::state::AppState) for
//! the duration of one request and hold no state of their own.

pub mod address;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
