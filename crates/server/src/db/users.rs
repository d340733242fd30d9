//! `PostgreSQL` implementation of [`UserStore`].
//!
//! Embedded lists are updated in place with JSONB operators, so every write is
//! a single `UPDATE` against one row and never a read-modify-write round trip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use bazaar_core::{
    Address, AddressFields, AddressId, AddressSlot, CartItem, Email, Order, PhoneNumber, Price,
    ProductId, UserId,
};

use super::{OrderWrite, PgStore, RepositoryError, UserStore, WriteOutcome};
use crate::models::{NewUser, TokenHashes, User};

macro_rules! user_columns {
    () => {
        "id, first_name, last_name, email, phone, cart, addresses, orders, version, \
         created_at, updated_at"
    };
}

/// Raw `bazaar.users` row, before the contact fields are re-validated.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    cart: Json<Vec<CartItem>>,
    addresses: Json<Vec<Address>>,
    orders: Json<Vec<Order>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = PhoneNumber::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email,
            phone,
            cart: row.cart.0,
            addresses: row.addresses.0,
            orders: row.orders.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let message = match db_err.constraint() {
            Some("users_phone_key") => "phone number already in use",
            _ => "user already exists",
        };
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

fn to_db_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl PgStore {
    /// Classify an `UPDATE` that touched `rows` rows.
    ///
    /// Zero rows means either the user is missing or the `WHERE` guard failed;
    /// a follow-up existence check tells the two apart.
    async fn outcome(&self, id: UserId, rows: u64) -> Result<WriteOutcome, RepositoryError> {
        if rows > 0 {
            return Ok(WriteOutcome::Applied);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bazaar.users WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool())
                .await?;

        Ok(if exists {
            WriteOutcome::Unchanged
        } else {
            WriteOutcome::UserMissing
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "INSERT INTO bazaar.users (id, first_name, last_name, email, phone, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING ",
            user_columns!()
        ))
        .bind(UserId::generate())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.email.as_str())
        .bind(user.phone.as_str())
        .bind(&user.password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(map_unique_violation)?;

        User::try_from(row)
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bazaar.users WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(self.pool())
                .await?;
        Ok(exists)
    }

    async fn phone_exists(&self, phone: &PhoneNumber) -> Result<bool, RepositoryError> {
        let exists =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bazaar.users WHERE phone = $1)")
                .bind(phone.as_str())
                .fetch_one(self.pool())
                .await?;
        Ok(exists)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM bazaar.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(concat!(
            "SELECT ",
            user_columns!(),
            ", password_hash FROM bazaar.users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| Ok((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    async fn set_tokens(
        &self,
        id: UserId,
        tokens: &TokenHashes,
    ) -> Result<WriteOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bazaar.users
            SET access_token_hash = $2,
                access_expires_at = $3,
                refresh_token_hash = $4,
                refresh_expires_at = $5,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&tokens.access_hash)
        .bind(tokens.access_expires_at)
        .bind(&tokens.refresh_hash)
        .bind(tokens.refresh_expires_at)
        .execute(self.pool())
        .await?;

        self.outcome(id, result.rows_affected()).await
    }

    async fn find_by_access_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError> {
        let id = sqlx::query_scalar(
            "SELECT id FROM bazaar.users WHERE access_token_hash = $1 AND access_expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;
        Ok(id)
    }

    async fn find_by_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError> {
        let id = sqlx::query_scalar(
            "SELECT id FROM bazaar.users WHERE refresh_token_hash = $1 AND refresh_expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;
        Ok(id)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    async fn push_cart_item(
        &self,
        id: UserId,
        item: &CartItem,
    ) -> Result<WriteOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bazaar.users
            SET cart = cart || jsonb_build_array($2::jsonb),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(Json(item))
        .execute(self.pool())
        .await?;

        self.outcome(id, result.rows_affected()).await
    }

    async fn pull_cart_items(
        &self,
        id: UserId,
        product_id: ProductId,
    ) -> Result<WriteOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bazaar.users
            SET cart = COALESCE(
                    (SELECT jsonb_agg(item ORDER BY pos)
                     FROM jsonb_array_elements(cart) WITH ORDINALITY AS e(item, pos)
                     WHERE item->>'productId' <> $2),
                    '[]'::jsonb),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
              AND cart @> jsonb_build_array(jsonb_build_object('productId', $2::text))
            ",
        )
        .bind(id)
        .bind(product_id.to_string())
        .execute(self.pool())
        .await?;

        self.outcome(id, result.rows_affected()).await
    }

    async fn cart_total(&self, id: UserId) -> Result<Option<Price>, RepositoryError> {
        let total: Option<i64> = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM((item->>'price')::bigint), 0)::bigint
            FROM bazaar.users u
            LEFT JOIN LATERAL jsonb_array_elements(u.cart) AS item ON TRUE
            WHERE u.id = $1
            GROUP BY u.id
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        total
            .map(|t| {
                Price::try_from(t).map_err(|_| {
                    RepositoryError::DataCorruption(format!("negative cart total: {t}"))
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
        let (clear_cart, expected_version) = match write {
            OrderWrite::Checkout { expected_version } => (true, Some(expected_version)),
            OrderWrite::Instant => (false, None),
        };

        let result = sqlx::query(
            r"
            UPDATE bazaar.users
            SET orders = orders || jsonb_build_array($2::jsonb),
                cart = CASE WHEN $3 THEN '[]'::jsonb ELSE cart END,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
              AND ($4::bigint IS NULL OR version = $4)
            ",
        )
        .bind(id)
        .bind(Json(order))
        .bind(clear_cart)
        .bind(expected_version)
        .execute(self.pool())
        .await?;

        self.outcome(id, result.rows_affected()).await
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    async fn address_count(&self, id: UserId) -> Result<Option<usize>, RepositoryError> {
        let count: Option<i64> = sqlx::query_scalar(
            r"
            SELECT COUNT(addr)
            FROM bazaar.users u
            LEFT JOIN LATERAL jsonb_array_elements(u.addresses) AS addr ON TRUE
            WHERE u.id = $1
            GROUP BY u.id
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        count
            .map(|c| {
                usize::try_from(c).map_err(|_| {
                    RepositoryError::DataCorruption(format!("invalid address count: {c}"))
                })
            })
            .transpose()
    }

    async fn push_address(
        &self,
        id: UserId,
        address: &Address,
        limit: usize,
    ) -> Result<WriteOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bazaar.users
            SET addresses = addresses || jsonb_build_array($2::jsonb),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
              AND jsonb_array_length(addresses) < $3
            ",
        )
        .bind(id)
        .bind(Json(address))
        .bind(to_db_count(limit))
        .execute(self.pool())
        .await?;

        self.outcome(id, result.rows_affected()).await
    }

    async fn set_address_slot(
        &self,
        id: UserId,
        slot: AddressSlot,
        fields: &AddressFields,
    ) -> Result<WriteOutcome, RepositoryError> {
        let index = i32::try_from(slot.index()).unwrap_or(i32::MAX);

        let result = sqlx::query(
            r"
            UPDATE bazaar.users
            SET addresses = jsonb_set(
                    addresses,
                    ARRAY[$2::int::text],
                    (addresses -> $2::int) || $3::jsonb),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
              AND jsonb_array_length(addresses) > $2::int
            ",
        )
        .bind(id)
        .bind(index)
        .bind(Json(fields))
        .execute(self.pool())
        .await?;

        self.outcome(id, result.rows_affected()).await
    }

    async fn clear_addresses(&self, id: UserId) -> Result<WriteOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bazaar.users
            SET addresses = '[]'::jsonb,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(self.pool())
        .await?;

        self.outcome(id, result.rows_affected()).await
    }

    async fn remove_address(
        &self,
        id: UserId,
        address_id: AddressId,
    ) -> Result<WriteOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bazaar.users
            SET addresses = COALESCE(
                    (SELECT jsonb_agg(addr ORDER BY pos)
                     FROM jsonb_array_elements(addresses) WITH ORDINALITY AS e(addr, pos)
                     WHERE addr->>'id' <> $2),
                    '[]'::jsonb),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
              AND addresses @> jsonb_build_array(jsonb_build_object('id', $2::text))
            ",
        )
        .bind(id)
        .bind(address_id.to_string())
        .execute(self.pool())
        .await?;

        self.outcome(id, result.rows_affected()).await
    }
}
