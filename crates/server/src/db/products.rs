//! `PostgreSQL` implementation of [`ProductStore`].

use async_trait::async_trait;

use bazaar_core::{Price, Product, ProductId};

use super::{PgStore, ProductStore, RepositoryError};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: i64,
    rating: i16,
    image: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::try_from(row.price).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative price for product {}", row.id))
        })?;
        let rating = u8::try_from(row.rating).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid rating for product {}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            price,
            rating,
            image: row.image,
        })
    }
}

/// Escape `LIKE` wildcards so a search term matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let price = i64::try_from(product.price.minor_units())
            .map_err(|_| RepositoryError::Conflict("price out of range".to_owned()))?;

        sqlx::query(
            r"
            INSERT INTO bazaar.products (id, name, price, rating, image)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(price)
        .bind(i16::from(product.rating))
        .bind(product.image.as_deref())
        .execute(self.pool())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("product already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, rating, image FROM bazaar.products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, rating, image FROM bazaar.products ORDER BY name, id",
        )
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn search_products(&self, needle: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, rating, image
            FROM bazaar.products
            WHERE name ILIKE '%' || $1 || '%'
            ORDER BY name, id
            ",
        )
        .bind(escape_like(needle))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }
}
