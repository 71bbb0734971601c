use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::guard::CurrentUser,
    bookings::{
        dto::{cancellation_allowed, CreateBookingRequest},
        repo::Booking,
    },
    domain::{BookingStatus, Role},
    error::ApiError,
    policy,
    state::AppState,
    users::dto::Pagination,
    venues::repo::VenueSlot,
};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_booking(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let slot = VenueSlot::find_by_id(&state.db, payload.slot_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Slot not found".into()))?;

    if slot.starts_at <= OffsetDateTime::now_utc() {
        return Err(ApiError::Validation("Slot is in the past".into()));
    }
    if !policy::can_join(caller.gender, slot.gender_category) {
        warn!(user_id = %caller.sub, slot_id = %slot.id, "booking blocked by gender gate");
        return Err(ApiError::Forbidden(
            "Your gender does not have access to this resource".into(),
        ));
    }
    if slot.booked {
        return Err(ApiError::Conflict("Slot is already booked".into()));
    }

    let booking = Booking::create(&state.db, caller.sub, slot.id)
        .await
        .map_err(|e| match &e {
            // Concurrent booking of the same slot: the unique index decides.
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("Slot is already booked".into())
            }
            _ => ApiError::from(e),
        })?;

    info!(booking_id = %booking.id, user_id = %caller.sub, slot_id = %slot.id, "slot booked");
    Ok((StatusCode::CREATED, Json(booking)))
}

#[instrument(skip(state, caller))]
pub async fn list_bookings(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(
        Booking::list_by_user(&state.db, caller.sub, p.limit(), p.offset()).await?,
    ))
}

#[instrument(skip(state, caller))]
pub async fn get_booking(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = Booking::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;
    if booking.user_id != caller.sub && caller.role != Role::Admin {
        return Err(ApiError::Forbidden("Not your booking".into()));
    }
    Ok(Json(booking))
}

#[instrument(skip(state, caller))]
pub async fn cancel_booking(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = Booking::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;
    if booking.user_id != caller.sub && caller.role != Role::Admin {
        return Err(ApiError::Forbidden("Not your booking".into()));
    }
    if matches!(
        booking.status,
        BookingStatus::Canceled | BookingStatus::Refunded
    ) {
        return Err(ApiError::Conflict("Booking is already canceled".into()));
    }

    let slot = VenueSlot::find_by_id(&state.db, booking.slot_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Slot not found".into()))?;
    if !cancellation_allowed(slot.starts_at, OffsetDateTime::now_utc()) {
        return Err(ApiError::Conflict(
            "Bookings can only be canceled more than 4 hours before the slot".into(),
        ));
    }

    let booking = Booking::cancel(&state.db, booking.id, booking.slot_id).await?;
    info!(booking_id = %booking.id, user_id = %caller.sub, "booking canceled");
    Ok(Json(booking))
}
