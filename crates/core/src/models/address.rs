//! Address book entries.
//!
//! A user keeps at most two addresses. Their position is their meaning: the
//! first one is the home address, the second the work address.

use serde::{Deserialize, Serialize};

use crate::types::AddressId;

/// Maximum number of addresses a user may store.
pub const MAX_ADDRESSES: usize = 2;

/// The editable part of an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressFields {
    pub house: String,
    pub street: String,
    pub city: String,
    #[serde(alias = "pinCode")]
    pub postal_code: String,
}

/// A stored address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub house: String,
    pub street: String,
    pub city: String,
    #[serde(alias = "pinCode")]
    pub postal_code: String,
}

impl Address {
    /// Create an address with a fresh ID.
    #[must_use]
    pub fn new(fields: AddressFields) -> Self {
        Self {
            id: AddressId::generate(),
            house: fields.house,
            street: fields.street,
            city: fields.city,
            postal_code: fields.postal_code,
        }
    }

    /// Overwrite every editable field, keeping the ID.
    pub fn apply(&mut self, fields: AddressFields) {
        self.house = fields.house;
        self.street = fields.street;
        self.city = fields.city;
        self.postal_code = fields.postal_code;
    }
}

/// Fixed positions in the address list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSlot {
    /// Slot 0.
    Home,
    /// Slot 1.
    Work,
}

impl AddressSlot {
    /// Position of this slot in the address list.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Home => 0,
            Self::Work => 1,
        }
    }

    /// Lowercase name for logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Work => "work",
        }
    }
}
