//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod id;
pub mod payment;
pub mod price;

pub use contact::{ContactError, Email, PhoneNumber};
pub use id::*;
pub use payment::PaymentMethod;
pub use price::Price;
