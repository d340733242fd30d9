//! Catalog entries and the documents embedded in a user record.
//!
//! A user record owns three lists: the cart ([`CartItem`]), the address book
//! ([`Address`], at most [`MAX_ADDRESSES`]) and the order history ([`Order`]).

pub mod address;
pub mod cart;
pub mod order;
pub mod product;

pub use address::{Address, AddressFields, AddressSlot, MAX_ADDRESSES};
pub use cart::{CartItem, cart_total};
pub use order::{Order, OrderError};
pub use product::{NewProduct, Product};
