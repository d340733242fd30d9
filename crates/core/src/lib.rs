//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types shared by all Bazaar components:
//! - `server` - REST backend (signup, catalog, cart, checkout, addresses)
//! - `cli` - Migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Every document that lives inside a user record (cart items,
//! addresses, orders) is defined here so the server, the CLI, and the tests
//! agree on its shape.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, contact details, payment
//! - [`models`] - Catalog and user-embedded documents

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
