//! Catalog route handlers.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{NewProduct, Product, ProductId};

use super::{IdQuery, required_id};
use crate::error::Result;
use crate::state::AppState;

/// Query for `/users/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

/// Add a product to the catalog.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let Json(product) = payload?;
    let product = state.catalog().add_product(product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// List every product.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list().await?))
}

/// One product by `?id=`.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    query: std::result::Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Product>> {
    let Query(query) = query?;
    let product_id: ProductId = required_id(query.id.as_deref())?;
    Ok(Json(state.catalog().get(product_id).await?))
}

/// Search products by name.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Product>>> {
    let Query(query) = query?;
    let name = query.name.unwrap_or_default();
    Ok(Json(state.catalog().search(&name).await?))
}
