//! Integer prices in the smallest currency unit.
//!
//! Prices are never fractional and never negative: a product costing $12.50
//! is stored as `Price::from_minor(1250)`. Sums are checked so a total can
//! never silently wrap.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A non-negative amount in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// The zero price.
    pub const ZERO: Self = Self(0);

    /// Create a price from an amount in minor units.
    #[must_use]
    pub const fn from_minor(amount: u64) -> Self {
        Self(amount)
    }

    /// Amount in minor units.
    #[must_use]
    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    /// Add two prices, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Sum a sequence of prices, returning `None` on overflow.
    ///
    /// An empty sequence sums to [`Price::ZERO`].
    pub fn checked_sum<I>(prices: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        prices
            .into_iter()
            .try_fold(Self::ZERO, |acc, price| acc.checked_add(price))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Price {
    fn from(amount: u64) -> Self {
        Self(amount)
    }
}

impl TryFrom<i64> for Price {
    type Error = core::num::TryFromIntError;

    fn try_from(amount: i64) -> Result<Self, Self::Error> {
        u64::try_from(amount).map(Self)
    }
}
