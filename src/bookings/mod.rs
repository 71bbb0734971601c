use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;

/// Bookings may be canceled up to this many hours before the slot starts.
pub const CANCELLATION_CUTOFF_HOURS: i64 = 4;

pub fn router() -> Router<AppState> {
    handlers::booking_routes()
}
