//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use redthread_core::ProductId;

use crate::backend::Product;
use crate::catalog::{FEATURED_LIMIT, ProductQuery};
use crate::error::Result;
use crate::state::AppState;

/// Product listing, filtered by `?category=`, sorted by `?sort=` and searched
/// with `?q=`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.backend().list_products(&query).await?))
}

/// Featured products for the home page.
#[instrument(skip(state))]
pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.backend().featured_products(FEATURED_LIMIT).await?))
}

/// A single product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.backend().get_product(id).await?))
}
