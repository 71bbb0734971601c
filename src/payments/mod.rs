use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod gateway;
pub mod handlers;
pub mod repo;

pub fn public_router() -> Router<AppState> {
    handlers::webhook_routes()
}

pub fn protected_router() -> Router<AppState> {
    handlers::payment_routes()
}
