//! Cart line items.

use serde::{Deserialize, Serialize};

use super::product::Product;
use crate::types::{Price, ProductId};

/// A snapshot of a product taken when it was added to a cart.
///
/// The price is copied, not referenced: later catalog price changes do not
/// affect items already in a cart or an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(rename = "productName")]
    pub name: String,
    pub price: Price,
    pub rating: u8,
    pub image: Option<String>,
}

impl From<&Product> for CartItem {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            rating: product.rating,
            image: product.image.clone(),
        }
    }
}

/// Sum the prices of a list of line items.
///
/// Returns `None` if the total does not fit in a [`Price`]. An empty list
/// totals zero.
#[must_use]
pub fn cart_total(items: &[CartItem]) -> Option<Price> {
    Price::checked_sum(items.iter().map(|item| item.price))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: u64) -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            name: format!("item-{price}"),
            price: Price::from_minor(price),
            rating: 4,
            image: None,
        }
    }

    #[test]
    fn test_cart_total_empty() {
        assert_eq!(cart_total(&[]), Some(Price::ZERO));
    }

    #[test]
    fn test_cart_total_sums_every_line() {
        let items = [item(100), item(250), item(100)];
        assert_eq!(cart_total(&items), Some(Price::from_minor(450)));
    }

    #[test]
    fn test_snapshot_copies_price() {
        let product = Product {
            id: ProductId::generate(),
            name: "Kettle".to_owned(),
            price: Price::from_minor(3999),
            rating: 5,
            image: Some("kettle.png".to_owned()),
        };
        let snapshot = CartItem::from(&product);
        assert_eq!(snapshot.product_id, product.id);
        assert_eq!(snapshot.price, Price::from_minor(3999));
        assert_eq!(snapshot.image.as_deref(), Some("kettle.png"));
    }
}
