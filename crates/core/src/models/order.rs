//! Orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cart::{CartItem, cart_total};
use crate::types::{OrderId, PaymentMethod, Price};

/// Errors building an [`Order`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The line items sum to more than a [`Price`] can hold.
    #[error("order total does not fit in a price")]
    TotalOverflow,
}

/// A completed purchase. Never modified after it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "orderList")]
    pub items: Vec<CartItem>,
    pub ordered_at: DateTime<Utc>,
    /// Sum of the line item prices.
    pub total_price: Price,
    pub discount: Option<Price>,
    pub payment_method: PaymentMethod,
}

impl Order {
    /// Build an order from line items, paid cash on delivery.
    ///
    /// The total is the exact sum of the item prices; an empty list gives a
    /// zero total.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::TotalOverflow` if the sum does not fit.
    pub fn from_items(items: Vec<CartItem>, ordered_at: DateTime<Utc>) -> Result<Self, OrderError> {
        let total_price = cart_total(&items).ok_or(OrderError::TotalOverflow)?;

        Ok(Self {
            id: OrderId::generate(),
            items,
            ordered_at,
            total_price,
            discount: None,
            payment_method: PaymentMethod::CashOnDelivery,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ProductId;

    fn item(price: u64) -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            name: "thing".to_owned(),
            price: Price::from_minor(price),
            rating: 3,
            image: None,
        }
    }

    #[test]
    fn test_from_items_totals_lines() {
        let order = Order::from_items(vec![item(100), item(250)], Utc::now()).unwrap();
        assert_eq!(order.total_price, Price::from_minor(350));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(order.discount, None);
    }

    #[test]
    fn test_from_items_empty() {
        let order = Order::from_items(Vec::new(), Utc::now()).unwrap();
        assert_eq!(order.total_price, Price::ZERO);
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_from_items_overflow() {
        let err = Order::from_items(vec![item(u64::MAX), item(1)], Utc::now()).unwrap_err();
        assert_eq!(err, OrderError::TotalOverflow);
    }

    #[test]
    fn test_wire_field_names() {
        let order = Order::from_items(vec![item(5)], Utc::now()).unwrap();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["totalPrice"], 5);
        assert_eq!(json["orderList"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["paymentMethod"], "cash_on_delivery");
    }
}
