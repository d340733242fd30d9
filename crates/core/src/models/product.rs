//! Catalog products.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(rename = "productName")]
    pub name: String,
    /// Unit price in minor units.
    pub price: Price,
    /// Rating from 0 to 5.
    pub rating: u8,
    pub image: Option<String>,
}

/// A product that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(rename = "productName")]
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewProduct {
    /// Highest accepted rating.
    pub const MAX_RATING: u8 = 5;

    /// Highest accepted price, the largest amount a `BIGINT` column holds.
    pub const MAX_PRICE: Price = Price::from_minor(i64::MAX.unsigned_abs());

    /// Attach a freshly generated ID.
    #[must_use]
    pub fn into_product(self) -> Product {
        Product {
            id: ProductId::generate(),
            name: self.name,
            price: self.price,
            rating: self.rating,
            image: self.image,
        }
    }
}
