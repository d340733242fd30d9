//! Product catalog.

use thiserror::Error;
use tracing::instrument;

use bazaar_core::{NewProduct, Price, Product, ProductId};

use crate::db::{ProductStore, RepositoryError};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Product name is blank.
    #[error("product name cannot be empty")]
    EmptyName,

    /// Rating is above [`NewProduct::MAX_RATING`].
    #[error("rating must be between 0 and {max}")]
    InvalidRating {
        /// Highest accepted rating.
        max: u8,
    },

    /// Price is above [`NewProduct::MAX_PRICE`].
    #[error("price must be at most {max}")]
    InvalidPrice {
        /// Highest accepted price in minor units.
        max: Price,
    },

    /// Search query is blank.
    #[error("search query cannot be empty")]
    EmptyQuery,

    /// No product with the given ID.
    #[error("product not found")]
    ProductNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Catalog lookups and admin product creation.
pub struct CatalogService<'a> {
    products: &'a dyn ProductStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductStore) -> Self {
        Self { products }
    }

    /// Validate and store a new product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyName`, `CatalogError::InvalidRating` or
    /// `CatalogError::InvalidPrice` for bad input.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add_product(&self, mut product: NewProduct) -> Result<Product, CatalogError> {
        product.name = product.name.trim().to_owned();
        if product.name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if product.rating > NewProduct::MAX_RATING {
            return Err(CatalogError::InvalidRating {
                max: NewProduct::MAX_RATING,
            });
        }
        if product.price > NewProduct::MAX_PRICE {
            return Err(CatalogError::InvalidPrice {
                max: NewProduct::MAX_PRICE,
            });
        }

        let product = product.into_product();
        self.products.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, "product added");
        Ok(product)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if it does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Every product, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list_products().await?)
    }

    /// Products whose name contains `query`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyQuery` for a blank query.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::EmptyQuery);
        }
        Ok(self.products.search_products(query).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn new_product(name: &str, rating: u8) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            price: Price::from_minor(1200),
            rating,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let product = catalog.add_product(new_product("  Teapot ", 4)).await.unwrap();
        assert_eq!(product.name, "Teapot");
        assert_eq!(catalog.get(product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        assert!(matches!(
            catalog.add_product(new_product("   ", 3)).await,
            Err(CatalogError::EmptyName)
        ));
        assert!(matches!(
            catalog.add_product(new_product("Lamp", 6)).await,
            Err(CatalogError::InvalidRating { max: 5 })
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_price_above_storable_range() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let mut huge = new_product("Huge", 3);
        huge.price = Price::from_minor(u64::MAX);
        assert!(matches!(
            catalog.add_product(huge).await,
            Err(CatalogError::InvalidPrice { max }) if max == NewProduct::MAX_PRICE
        ));
        assert!(catalog.list().await.unwrap().is_empty());

        let mut top = new_product("Top", 3);
        top.price = NewProduct::MAX_PRICE;
        let product = catalog.add_product(top).await.unwrap();
        assert_eq!(product.price.minor_units(), i64::MAX.unsigned_abs());
    }

    #[tokio::test]
    async fn test_list_orders_by_name() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        for name in ["Vase", "Apron", "Mug"] {
            catalog.add_product(new_product(name, 0)).await.unwrap();
        }

        let names: Vec<String> = catalog
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Apron", "Mug", "Vase"]);
    }

    #[tokio::test]
    async fn test_search() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog.add_product(new_product("Green Tea", 5)).await.unwrap();
        catalog.add_product(new_product("Coffee", 5)).await.unwrap();

        let hits = catalog.search("tea").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Green Tea");

        assert!(matches!(
            catalog.search("  ").await,
            Err(CatalogError::EmptyQuery)
        ));
        assert!(catalog.get(ProductId::generate()).await.is_err());
    }
}
