use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::services::{compute_stats, DashboardStats};
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState, users::handlers::require_staff};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/admin/dashboard", get(get_dashboard))
}

#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthUser(viewer_id): AuthUser,
) -> Result<Json<DashboardStats>, AppError> {
    require_staff(&state, &viewer_id).await?;

    let (users, products, orders) = tokio::try_join!(
        state.users.list_by_email(),
        state.catalog.list_products(),
        state.catalog.list_orders(),
    )?;
    Ok(Json(compute_stats(&users, &products, orders)))
}
