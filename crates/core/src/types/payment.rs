//! Payment method recorded on an order.

use serde::{Deserialize, Serialize};

/// How an order is paid for.
///
/// Exactly one method applies to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid online.
    Digital,
    /// Paid to the courier on delivery.
    #[default]
    CashOnDelivery,
}
