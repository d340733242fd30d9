//! In-process store used by tests and `BAZAAR_STORE=memory`.
//!
//! Each method takes the write lock for its whole body, which gives the same
//! single-record atomicity as one `UPDATE` in `PostgreSQL`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use bazaar_core::{
    Address, AddressFields, AddressId, AddressSlot, CartItem, Email, Order, PhoneNumber, Price,
    Product, ProductId, UserId, cart_total,
};

use super::{OrderWrite, ProductStore, RepositoryError, UserStore, WriteOutcome};
use crate::models::{NewUser, TokenHashes, User};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
    tokens: Option<TokenHashes>,
}

impl UserRecord {
    fn touch(&mut self) {
        self.user.version += 1;
        self.user.updated_at = Utc::now();
    }
}

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<UserId, UserRecord>,
    products: HashMap<ProductId, Product>,
}

/// Store backed by hash maps behind a shared lock.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Run `f` against the user's record if it exists.
fn with_user<F>(collections: &mut Collections, id: UserId, f: F) -> WriteOutcome
where
    F: FnOnce(&mut UserRecord) -> bool,
{
    match collections.users.get_mut(&id) {
        Some(record) => {
            if f(record) {
                record.touch();
                WriteOutcome::Applied
            } else {
                WriteOutcome::Unchanged
            }
        }
        None => WriteOutcome::UserMissing,
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut guard = self.inner.write().await;

        if guard.users.values().any(|r| r.user.email == user.email) {
            return Err(RepositoryError::Conflict("user already exists".to_owned()));
        }
        if guard.users.values().any(|r| r.user.phone == user.phone) {
            return Err(RepositoryError::Conflict(
                "phone number already in use".to_owned(),
            ));
        }

        let now = Utc::now();
        let created = User {
            id: UserId::generate(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            cart: Vec::new(),
            addresses: Vec::new(),
            orders: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        guard.users.insert(
            created.id,
            UserRecord {
                user: created.clone(),
                password_hash: user.password_hash,
                tokens: None,
            },
        );

        Ok(created)
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard.users.values().any(|r| &r.user.email == email))
    }

    async fn phone_exists(&self, phone: &PhoneNumber) -> Result<bool, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard.users.values().any(|r| &r.user.phone == phone))
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard.users.get(&id).map(|r| r.user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn set_tokens(
        &self,
        id: UserId,
        tokens: &TokenHashes,
    ) -> Result<WriteOutcome, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(match guard.users.get_mut(&id) {
            Some(record) => {
                record.tokens = Some(tokens.clone());
                WriteOutcome::Applied
            }
            None => WriteOutcome::UserMissing,
        })
    }

    async fn find_by_access_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard
            .users
            .values()
            .find(|r| {
                r.tokens
                    .as_ref()
                    .is_some_and(|t| t.access_hash == token_hash && t.access_expires_at > now)
            })
            .map(|r| r.user.id))
    }

    async fn find_by_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard
            .users
            .values()
            .find(|r| {
                r.tokens
                    .as_ref()
                    .is_some_and(|t| t.refresh_hash == token_hash && t.refresh_expires_at > now)
            })
            .map(|r| r.user.id))
    }

    async fn push_cart_item(
        &self,
        id: UserId,
        item: &CartItem,
    ) -> Result<WriteOutcome, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(with_user(&mut guard, id, |r| {
            r.user.cart.push(item.clone());
            true
        }))
    }

    async fn pull_cart_items(
        &self,
        id: UserId,
        product_id: ProductId,
    ) -> Result<WriteOutcome, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(with_user(&mut guard, id, |r| {
            let before = r.user.cart.len();
            r.user.cart.retain(|item| item.product_id != product_id);
            r.user.cart.len() != before
        }))
    }

    async fn cart_total(&self, id: UserId) -> Result<Option<Price>, RepositoryError> {
        let guard = self.inner.read().await;
        guard
            .users
            .get(&id)
            .map(|r| {
                cart_total(&r.user.cart).ok_or_else(|| {
                    RepositoryError::DataCorruption("cart total overflows".to_owned())
                })
            })
            .transpose()
    }

    async fn commit_order(
        &self,
        id: UserId,
        order: &Order,
        write: OrderWrite,
    ) -> Result<WriteOutcome, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(with_user(&mut guard, id, |r| match write {
            OrderWrite::Checkout { expected_version } => {
                if r.user.version != expected_version {
                    return false;
                }
                r.user.orders.push(order.clone());
                r.user.cart.clear();
                true
            }
            OrderWrite::Instant => {
                r.user.orders.push(order.clone());
                true
            }
        }))
    }

    async fn address_count(&self, id: UserId) -> Result<Option<usize>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard.users.get(&id).map(|r| r.user.addresses.len()))
    }

    async fn push_address(
        &self,
        id: UserId,
        address: &Address,
        limit: usize,
    ) -> Result<WriteOutcome, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(with_user(&mut guard, id, |r| {
            if r.user.addresses.len() >= limit {
                return false;
            }
            r.user.addresses.push(address.clone());
            true
        }))
    }

    async fn set_address_slot(
        &self,
        id: UserId,
        slot: AddressSlot,
        fields: &AddressFields,
    ) -> Result<WriteOutcome, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(with_user(&mut guard, id, |r| {
            match r.user.addresses.get_mut(slot.index()) {
                Some(address) => {
                    address.apply(fields.clone());
                    true
                }
                None => false,
            }
        }))
    }

    async fn clear_addresses(&self, id: UserId) -> Result<WriteOutcome, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(with_user(&mut guard, id, |r| {
            r.user.addresses.clear();
            true
        }))
    }

    async fn remove_address(
        &self,
        id: UserId,
        address_id: AddressId,
    ) -> Result<WriteOutcome, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(with_user(&mut guard, id, |r| {
            let before = r.user.addresses.len();
            r.user.addresses.retain(|a| a.id != address_id);
            r.user.addresses.len() != before
        }))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut guard = self.inner.write().await;
        if guard.products.contains_key(&product.id) {
            return Err(RepositoryError::Conflict("product already exists".to_owned()));
        }
        guard.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let guard = self.inner.read().await;
        let mut products: Vec<Product> = guard.products.values().cloned().collect();
        sort_by_name(&mut products);
        Ok(products)
    }

    async fn search_products(&self, needle: &str) -> Result<Vec<Product>, RepositoryError> {
        let needle = needle.to_lowercase();
        let guard = self.inner.read().await;
        let mut products: Vec<Product> = guard
            .products
            .values()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        sort_by_name(&mut products);
        Ok(products)
    }
}

fn sort_by_name(products: &mut [Product]) {
    products.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.id.as_uuid().cmp(&b.id.as_uuid()))
    });
}
