//! Integration tests for the `PostgreSQL` store.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - `BAZAAR_DATABASE_URL` (or `DATABASE_URL`) pointing at it
//!
//! Migrations are applied on connect. Every test creates its own users and
//! products with unique names, so runs can share one database.
//!
//! Run with: cargo test -p bazaar-integration-tests --test pg_store -- --ignored

#![allow(clippy::unwrap_used)]

use bazaar_core::{
    Address, AddressFields, AddressSlot, CartItem, Email, Order, PhoneNumber, Price, Product,
    ProductId, UserId,
};
use bazaar_server::db::{
    self, OrderWrite, PgStore, ProductStore, RepositoryError, UserStore, WriteOutcome,
};
use bazaar_server::models::{NewUser, TokenHashes};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use uuid::Uuid;

async fn store() -> PgStore {
    let url = std::env::var("BAZAAR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("BAZAAR_DATABASE_URL or DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("../server/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    PgStore::new(pool)
}

fn new_user() -> NewUser {
    let tag = Uuid::new_v4();
    let digits = tag.as_u128() % 10_000_000_000;
    NewUser {
        first_name: "Pat".to_owned(),
        last_name: "Gres".to_owned(),
        email: Email::parse(&format!("pg-{}@example.com", tag.simple())).unwrap(),
        phone: PhoneNumber::parse(&format!("+{digits:010}")).unwrap(),
        password_hash: "hash".to_owned(),
    }
}

fn item(product_id: ProductId, price: u64) -> CartItem {
    CartItem {
        product_id,
        name: "Mug".to_owned(),
        price: Price::from_minor(price),
        rating: 4,
        image: None,
    }
}

fn fields(city: &str) -> AddressFields {
    AddressFields {
        house: "1".to_owned(),
        street: "Main St".to_owned(),
        city: city.to_owned(),
        postal_code: "12345".to_owned(),
    }
}

fn product(name: String) -> Product {
    Product {
        id: ProductId::generate(),
        name,
        price: Price::from_minor(100),
        rating: 3,
        image: None,
    }
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_create_user_rejects_duplicate_email() {
    let store = store().await;
    let user = store.create_user(new_user()).await.unwrap();
    assert!(store.email_exists(&user.email).await.unwrap());
    assert!(store.phone_exists(&user.phone).await.unwrap());

    let mut same_email = new_user();
    same_email.email = user.email.clone();
    assert!(matches!(
        store.create_user(same_email).await,
        Err(RepositoryError::Conflict(_))
    ));

    let fetched = store.get_by_id(user.id).await.unwrap().unwrap();
    assert!(fetched.cart.is_empty());
    assert!(fetched.addresses.is_empty());
    assert!(fetched.orders.is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_tokens_resolve_until_expiry() {
    let store = store().await;
    let user = store.create_user(new_user()).await.unwrap();
    let now = Utc::now();
    let access_hash = format!("access-{}", Uuid::new_v4().simple());
    let refresh_hash = format!("refresh-{}", Uuid::new_v4().simple());

    let tokens = TokenHashes {
        access_hash: access_hash.clone(),
        access_expires_at: now + Duration::hours(1),
        refresh_hash: refresh_hash.clone(),
        refresh_expires_at: now + Duration::days(7),
    };
    assert_eq!(
        store.set_tokens(user.id, &tokens).await.unwrap(),
        WriteOutcome::Applied
    );

    assert_eq!(
        store.find_by_access_token(&access_hash, now).await.unwrap(),
        Some(user.id)
    );
    assert_eq!(
        store
            .find_by_access_token(&access_hash, now + Duration::hours(2))
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        store.find_by_refresh_token(&refresh_hash, now).await.unwrap(),
        Some(user.id)
    );
    assert_eq!(
        store.set_tokens(UserId::generate(), &tokens).await.unwrap(),
        WriteOutcome::UserMissing
    );
}

// ============================================================================
// Cart and orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_cart_total_and_pull() {
    let store = store().await;
    let user = store.create_user(new_user()).await.unwrap();
    let mug = ProductId::generate();
    let pen = ProductId::generate();

    for line in [item(mug, 100), item(pen, 250), item(mug, 100)] {
        assert_eq!(
            store.push_cart_item(user.id, &line).await.unwrap(),
            WriteOutcome::Applied
        );
    }
    assert_eq!(
        store.cart_total(user.id).await.unwrap(),
        Some(Price::from_minor(450))
    );

    assert_eq!(
        store.pull_cart_items(user.id, mug).await.unwrap(),
        WriteOutcome::Applied
    );
    let cart = store.get_by_id(user.id).await.unwrap().unwrap().cart;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].product_id, pen);

    assert_eq!(
        store.pull_cart_items(user.id, mug).await.unwrap(),
        WriteOutcome::Unchanged
    );
    assert_eq!(
        store.cart_total(user.id).await.unwrap(),
        Some(Price::from_minor(250))
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_missing_user_outcomes() {
    let store = store().await;
    let ghost = UserId::generate();

    assert_eq!(
        store
            .push_cart_item(ghost, &item(ProductId::generate(), 1))
            .await
            .unwrap(),
        WriteOutcome::UserMissing
    );
    assert_eq!(store.cart_total(ghost).await.unwrap(), None);
    assert_eq!(store.address_count(ghost).await.unwrap(), None);
    assert!(store.get_by_id(ghost).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_checkout_write_checks_version() {
    let store = store().await;
    let user = store.create_user(new_user()).await.unwrap();
    store
        .push_cart_item(user.id, &item(ProductId::generate(), 10))
        .await
        .unwrap();

    let snapshot = store.get_by_id(user.id).await.unwrap().unwrap();
    let order = Order::from_items(snapshot.cart.clone(), Utc::now()).unwrap();

    let stale = OrderWrite::Checkout {
        expected_version: snapshot.version - 1,
    };
    assert_eq!(
        store.commit_order(user.id, &order, stale).await.unwrap(),
        WriteOutcome::Unchanged
    );

    let current = OrderWrite::Checkout {
        expected_version: snapshot.version,
    };
    assert_eq!(
        store.commit_order(user.id, &order, current).await.unwrap(),
        WriteOutcome::Applied
    );

    let after = store.get_by_id(user.id).await.unwrap().unwrap();
    assert!(after.cart.is_empty());
    assert_eq!(after.orders.len(), 1);
    assert_eq!(after.orders[0].total_price, order.total_price);
    assert!(after.version > snapshot.version);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_instant_order_keeps_cart() {
    let store = store().await;
    let user = store.create_user(new_user()).await.unwrap();
    store
        .push_cart_item(user.id, &item(ProductId::generate(), 10))
        .await
        .unwrap();

    let order = Order::from_items(vec![item(ProductId::generate(), 99)], Utc::now()).unwrap();
    assert_eq!(
        store
            .commit_order(user.id, &order, OrderWrite::Instant)
            .await
            .unwrap(),
        WriteOutcome::Applied
    );

    let after = store.get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(after.cart.len(), 1);
    assert_eq!(after.orders.len(), 1);
}

// ============================================================================
// Addresses
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_push_address_respects_limit() {
    let store = store().await;
    let user = store.create_user(new_user()).await.unwrap();

    for city in ["A", "B"] {
        let outcome = store
            .push_address(user.id, &Address::new(fields(city)), 2)
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Applied);
    }
    let outcome = store
        .push_address(user.id, &Address::new(fields("C")), 2)
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Unchanged);
    assert_eq!(store.address_count(user.id).await.unwrap(), Some(2));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_slot_edit_and_removal() {
    let store = store().await;
    let user = store.create_user(new_user()).await.unwrap();
    let home = Address::new(fields("Home"));
    store.push_address(user.id, &home, 2).await.unwrap();

    assert_eq!(
        store
            .set_address_slot(user.id, AddressSlot::Work, &fields("Office"))
            .await
            .unwrap(),
        WriteOutcome::Unchanged
    );

    store
        .push_address(user.id, &Address::new(fields("Work")), 2)
        .await
        .unwrap();
    assert_eq!(
        store
            .set_address_slot(user.id, AddressSlot::Work, &fields("Office"))
            .await
            .unwrap(),
        WriteOutcome::Applied
    );
    let addresses = store.get_by_id(user.id).await.unwrap().unwrap().addresses;
    assert_eq!(addresses[0].city, "Home");
    assert_eq!(addresses[1].city, "Office");

    assert_eq!(
        store.remove_address(user.id, home.id).await.unwrap(),
        WriteOutcome::Applied
    );
    assert_eq!(
        store.remove_address(user.id, home.id).await.unwrap(),
        WriteOutcome::Unchanged
    );
    let addresses = store.get_by_id(user.id).await.unwrap().unwrap().addresses;
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].city, "Office");

    assert_eq!(
        store.clear_addresses(user.id).await.unwrap(),
        WriteOutcome::Applied
    );
    assert_eq!(store.address_count(user.id).await.unwrap(), Some(0));
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_product_round_trip_and_lookup() {
    let store = store().await;
    let mut top = product(format!("{} Top", Uuid::new_v4().simple()));
    top.price = Price::from_minor(i64::MAX.unsigned_abs());

    store.insert_product(&top).await.unwrap();
    assert_eq!(store.get_product(top.id).await.unwrap(), Some(top.clone()));
    assert!(store.list_products().await.unwrap().contains(&top));
    assert!(store.get_product(ProductId::generate()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_search_treats_wildcards_literally() {
    let store = store().await;
    let tag = Uuid::new_v4().simple().to_string();
    for name in [
        format!("{tag} 100% Cotton"),
        format!("{tag} 1000 Cotton"),
        format!("{tag} a_b"),
        format!("{tag} axb"),
    ] {
        store.insert_product(&product(name)).await.unwrap();
    }

    let names = |hits: Vec<Product>| hits.into_iter().map(|p| p.name).collect::<Vec<_>>();

    let percent = store.search_products(&format!("{tag} 100%")).await.unwrap();
    assert_eq!(names(percent), [format!("{tag} 100% Cotton")]);

    let underscore = store
        .search_products(&format!("{} A_B", tag.to_uppercase()))
        .await
        .unwrap();
    assert_eq!(names(underscore), [format!("{tag} a_b")]);

    let all = store.search_products(&tag).await.unwrap();
    assert_eq!(all.len(), 4);
}
