use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::repo_types::Product;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

fn filter_products(products: Vec<Product>, q: &ProductQuery) -> Vec<Product> {
    let needle = q.search.as_deref().unwrap_or("").to_lowercase();
    products
        .into_iter()
        .filter(|p| match q.category.as_deref() {
            Some(cat) => p.category.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(cat)),
            None => true,
        })
        .filter(|p| {
            needle.is_empty()
                || p.name.to_lowercase().contains(&needle)
                || p.description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .collect()
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(filter_products(products, &q)))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    state
        .catalog
        .get_product(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".into()))
}
