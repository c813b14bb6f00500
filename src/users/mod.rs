//! The user directory behind the admin users view.

use crate::state::AppState;
use axum::Router;

pub mod directory;
mod dto;
pub mod error;
pub mod handlers;
pub mod permissions;
pub mod projection;
pub mod record;
pub mod registry;
pub mod role;
pub mod store;

pub fn router() -> Router<AppState> {
    handlers::admin_routes()
}
