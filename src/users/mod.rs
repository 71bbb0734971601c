use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}

pub fn admin_router() -> Router<AppState> {
    handlers::admin_routes()
}
