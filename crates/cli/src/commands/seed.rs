//! Seed the product catalog from a YAML file.
//!
//! The file is a list of products in the same shape `/admin/addproduct`
//! accepts:
//!
//! ```yaml
//! - productName: Alpha Phone
//!   price: 100
//!   rating: 4
//!   image: alpha.jpg
//! ```

use std::path::Path;

use bazaar_core::NewProduct;
use bazaar_server::db::{self, PgStore};
use bazaar_server::services::catalog::CatalogService;
use tracing::info;

use super::{CommandError, database_url};

/// Parse a seed file without touching the database.
///
/// # Errors
///
/// Returns `CommandError::Yaml` if the document is not a product list.
pub fn parse(content: &str) -> Result<Vec<NewProduct>, CommandError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Insert every product in `file_path`.
///
/// Products go through the same validation as the admin route. The first
/// rejected product stops the run; earlier inserts are kept.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the database is
/// unreachable, or a product fails validation.
pub async fn products(file_path: &Path) -> Result<(), CommandError> {
    info!(path = %file_path.display(), "Loading products from file");

    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.display().to_string(),
            source,
        })?;
    let products = parse(&content)?;
    info!(count = products.len(), "Parsed seed file");

    let pool = db::create_pool(&database_url()?).await?;
    let store = PgStore::new(pool);
    let catalog = CatalogService::new(&store);

    let mut inserted = 0usize;
    for product in products {
        let name = product.name.clone();
        let product = catalog
            .add_product(product)
            .await
            .map_err(|source| CommandError::Product { name, source })?;
        info!(id = %product.id, name = %product.name, "Inserted product");
        inserted += 1;
    }

    info!(inserted, "Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_file() {
        let products = parse(
            "- productName: Alpha Phone\n  price: 100\n  rating: 4\n- productName: Beta Case\n  price: 250\n",
        )
        .unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Alpha Phone");
        assert_eq!(products[1].rating, 0);
        assert!(products[1].image.is_none());
    }

    #[test]
    fn test_parse_rejects_negative_price() {
        assert!(parse("- productName: Broken\n  price: -5\n").is_err());
    }
}
