//! Address book.
//!
//! Slot 0 is the home address and slot 1 the work address. Adding appends to
//! the next free slot; once both are taken further adds are refused.

use thiserror::Error;
use tracing::instrument;

use bazaar_core::{Address, AddressFields, AddressId, AddressSlot, MAX_ADDRESSES, UserId};

use crate::db::{RepositoryError, UserStore, WriteOutcome};

/// Errors from address operations.
#[derive(Debug, Error)]
pub enum AddressError {
    /// No user with the given ID.
    #[error("user not found")]
    UserNotFound,

    /// The user already has the maximum number of addresses.
    #[error("not allowed: already have {max} addresses")]
    LimitExceeded {
        /// The limit.
        max: usize,
    },

    /// A required field is blank.
    #[error("{0} cannot be empty")]
    MissingField(&'static str),

    /// No address with the given ID.
    #[error("address not found")]
    AddressNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What an edit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEdit {
    Updated,
    /// The slot had no address, nothing changed.
    Empty,
}

/// Manages a user's home and work addresses.
pub struct AddressService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AddressService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Add an address in the next free slot.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::LimitExceeded` if both slots are taken.
    /// Returns `AddressError::UserNotFound` if the user does not exist.
    #[instrument(skip(self, input))]
    pub async fn add(&self, user_id: UserId, input: AddressFields) -> Result<Address, AddressError> {
        let fields = validate(input)?;

        let count = self
            .users
            .address_count(user_id)
            .await?
            .ok_or(AddressError::UserNotFound)?;
        if count >= MAX_ADDRESSES {
            return Err(AddressError::LimitExceeded { max: MAX_ADDRESSES });
        }

        let address = Address::new(fields);
        // The write re-checks the limit, so a concurrent add cannot push the
        // count past it.
        match self
            .users
            .push_address(user_id, &address, MAX_ADDRESSES)
            .await?
        {
            WriteOutcome::Applied => Ok(address),
            WriteOutcome::Unchanged => Err(AddressError::LimitExceeded { max: MAX_ADDRESSES }),
            WriteOutcome::UserMissing => Err(AddressError::UserNotFound),
        }
    }

    /// Overwrite the address in `slot`.
    ///
    /// An empty slot is left empty and reported as [`SlotEdit::Empty`].
    ///
    /// # Errors
    ///
    /// Returns `AddressError::UserNotFound` if the user does not exist.
    #[instrument(skip(self, input), fields(slot = slot.as_str()))]
    pub async fn edit(
        &self,
        user_id: UserId,
        slot: AddressSlot,
        input: AddressFields,
    ) -> Result<SlotEdit, AddressError> {
        let fields = validate(input)?;

        match self.users.set_address_slot(user_id, slot, &fields).await? {
            WriteOutcome::Applied => Ok(SlotEdit::Updated),
            WriteOutcome::Unchanged => {
                tracing::debug!("no address in slot");
                Ok(SlotEdit::Empty)
            }
            WriteOutcome::UserMissing => Err(AddressError::UserNotFound),
        }
    }

    /// Remove every address.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::UserNotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<(), AddressError> {
        match self.users.clear_addresses(user_id).await? {
            WriteOutcome::Applied | WriteOutcome::Unchanged => Ok(()),
            WriteOutcome::UserMissing => Err(AddressError::UserNotFound),
        }
    }

    /// Remove one address by ID. Later addresses move up one slot.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::AddressNotFound` if no such address is stored.
    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, address_id: AddressId) -> Result<(), AddressError> {
        match self.users.remove_address(user_id, address_id).await? {
            WriteOutcome::Applied => Ok(()),
            WriteOutcome::Unchanged => Err(AddressError::AddressNotFound),
            WriteOutcome::UserMissing => Err(AddressError::UserNotFound),
        }
    }

    /// The user's addresses in slot order.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::UserNotFound` if the user does not exist.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, AddressError> {
        self.users
            .get_by_id(user_id)
            .await?
            .map(|user| user.addresses)
            .ok_or(AddressError::UserNotFound)
    }
}

fn validate(fields: AddressFields) -> Result<AddressFields, AddressError> {
    let fields = AddressFields {
        house: fields.house.trim().to_owned(),
        street: fields.street.trim().to_owned(),
        city: fields.city.trim().to_owned(),
        postal_code: fields.postal_code.trim().to_owned(),
    };

    if fields.street.is_empty() {
        return Err(AddressError::MissingField("street"));
    }
    if fields.city.is_empty() {
        return Err(AddressError::MissingField("city"));
    }
    if fields.postal_code.is_empty() {
        return Err(AddressError::MissingField("postal code"));
    }
    Ok(fields)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewUser;
    use bazaar_core::{Email, PhoneNumber};

    async fn setup() -> (MemoryStore, UserId) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                first_name: "Ann".to_owned(),
                last_name: "Lee".to_owned(),
                email: Email::parse("ann@example.com").unwrap(),
                phone: PhoneNumber::parse("5550100").unwrap(),
                password_hash: "hash".to_owned(),
            })
            .await
            .unwrap();
        (store, user.id)
    }

    fn fields(city: &str) -> AddressFields {
        AddressFields {
            house: "12".to_owned(),
            street: "Elm St".to_owned(),
            city: city.to_owned(),
            postal_code: "90210".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_third_address_refused() {
        let (store, user_id) = setup().await;
        let addresses = AddressService::new(&store);

        addresses.add(user_id, fields("Home Town")).await.unwrap();
        addresses.add(user_id, fields("Work City")).await.unwrap();

        let err = addresses.add(user_id, fields("Third")).await.unwrap_err();
        assert!(matches!(err, AddressError::LimitExceeded { max: 2 }));
        assert_eq!(addresses.list(user_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_edits_touch_only_their_slot() {
        let (store, user_id) = setup().await;
        let addresses = AddressService::new(&store);
        let home = addresses.add(user_id, fields("Home Town")).await.unwrap();
        let work = addresses.add(user_id, fields("Work City")).await.unwrap();

        let edit = addresses
            .edit(user_id, AddressSlot::Home, fields("New Home"))
            .await
            .unwrap();
        assert_eq!(edit, SlotEdit::Updated);

        let list = addresses.list(user_id).await.unwrap();
        assert_eq!(list[0].id, home.id);
        assert_eq!(list[0].city, "New Home");
        assert_eq!(list[1], work);

        addresses
            .edit(user_id, AddressSlot::Work, fields("New Office"))
            .await
            .unwrap();
        let list = addresses.list(user_id).await.unwrap();
        assert_eq!(list[0].city, "New Home");
        assert_eq!(list[1].city, "New Office");
    }

    #[tokio::test]
    async fn test_edit_missing_slot_is_noop() {
        let (store, user_id) = setup().await;
        let addresses = AddressService::new(&store);
        addresses.add(user_id, fields("Home Town")).await.unwrap();

        let edit = addresses
            .edit(user_id, AddressSlot::Work, fields("Office"))
            .await
            .unwrap();
        assert_eq!(edit, SlotEdit::Empty);
        assert_eq!(addresses.list(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_and_remove() {
        let (store, user_id) = setup().await;
        let addresses = AddressService::new(&store);
        let home = addresses.add(user_id, fields("Home Town")).await.unwrap();
        let work = addresses.add(user_id, fields("Work City")).await.unwrap();

        addresses.remove(user_id, home.id).await.unwrap();
        assert_eq!(addresses.list(user_id).await.unwrap(), vec![work]);
        assert!(matches!(
            addresses.remove(user_id, home.id).await,
            Err(AddressError::AddressNotFound)
        ));

        addresses.clear(user_id).await.unwrap();
        assert!(addresses.list(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_city_rejected() {
        let (store, user_id) = setup().await;
        let addresses = AddressService::new(&store);

        assert!(matches!(
            addresses.add(user_id, fields("  ")).await,
            Err(AddressError::MissingField("city"))
        ));
    }
}
