use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::guard::CurrentUser,
    error::ApiError,
    policy,
    state::AppState,
    users::dto::Pagination,
    venues::{
        dto::{CreateSlotRequest, CreateVenueRequest, UpdateSlotRequest, UpdateVenueRequest},
        repo::{Venue, VenueSlot},
    },
};

pub fn venue_routes() -> Router<AppState> {
    Router::new()
        .route("/venues", get(list_venues))
        .route("/venues/:id", get(get_venue))
        .route("/venues/:id/slots", get(list_slots))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/venues", post(create_venue))
        .route("/venues/:id", put(update_venue))
        .route("/venues/:id/slots", post(create_slot))
        .route("/venues/:id/slots/:slot_id", put(update_slot))
        .route("/venues/:id/slots/:slot_id", delete(delete_slot))
}

#[instrument(skip(state))]
pub async fn list_venues(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Venue>>, ApiError> {
    Ok(Json(Venue::list(&state.db, p.limit(), p.offset()).await?))
}

#[instrument(skip(state))]
pub async fn get_venue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Venue>, ApiError> {
    let venue = Venue::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Venue not found".into()))?;
    Ok(Json(venue))
}

/// Slots are filtered to the caller's visible gender categories.
#[instrument(skip(state, caller))]
pub async fn list_slots(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<VenueSlot>>, ApiError> {
    if Venue::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Venue not found".into()));
    }
    let slots =
        VenueSlot::list_visible(&state.db, id, policy::own_category(caller.gender)).await?;
    Ok(Json(slots))
}

#[instrument(skip(state, payload))]
pub async fn create_venue(
    State(state): State<AppState>,
    Json(payload): Json<CreateVenueRequest>,
) -> Result<(StatusCode, Json<Venue>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Venue name is required".into()));
    }
    if payload.price_per_slot < 0.0 {
        return Err(ApiError::Validation("Price cannot be negative".into()));
    }
    let venue = Venue::create(
        &state.db,
        payload.name.trim(),
        payload.sport,
        &payload.address,
        payload.price_per_slot,
    )
    .await?;
    info!(venue_id = %venue.id, "venue created");
    Ok((StatusCode::CREATED, Json(venue)))
}

#[instrument(skip(state, payload))]
pub async fn update_venue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVenueRequest>,
) -> Result<Json<Venue>, ApiError> {
    if let Some(price) = payload.price_per_slot {
        if price < 0.0 {
            return Err(ApiError::Validation("Price cannot be negative".into()));
        }
    }
    let venue = Venue::update(
        &state.db,
        id,
        payload.name.as_deref(),
        payload.address.as_deref(),
        payload.price_per_slot,
    )
    .await
    .map_err(ApiError::from)?;
    Ok(Json(venue))
}

#[instrument(skip(state, payload))]
pub async fn create_slot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<VenueSlot>), ApiError> {
    if payload.ends_at <= payload.starts_at {
        return Err(ApiError::Validation("Slot must end after it starts".into()));
    }
    if Venue::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Venue not found".into()));
    }
    let slot = VenueSlot::create(
        &state.db,
        id,
        payload.starts_at,
        payload.ends_at,
        payload.gender_category,
    )
    .await?;
    info!(venue_id = %id, slot_id = %slot.id, "slot created");
    Ok((StatusCode::CREATED, Json(slot)))
}

#[instrument(skip(state, payload))]
pub async fn update_slot(
    State(state): State<AppState>,
    Path((id, slot_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateSlotRequest>,
) -> Result<Json<VenueSlot>, ApiError> {
    let slot = VenueSlot::find_by_id(&state.db, slot_id)
        .await?
        .filter(|s| s.venue_id == id)
        .ok_or_else(|| ApiError::NotFound("Slot not found".into()))?;
    if slot.booked {
        return Err(ApiError::Conflict("Cannot modify a booked slot".into()));
    }
    let slot = VenueSlot::update(
        &state.db,
        slot_id,
        payload.starts_at,
        payload.ends_at,
        payload.gender_category,
    )
    .await
    .map_err(ApiError::from)?;
    Ok(Json(slot))
}

#[instrument(skip(state))]
pub async fn delete_slot(
    State(state): State<AppState>,
    Path((id, slot_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let slot = VenueSlot::find_by_id(&state.db, slot_id)
        .await?
        .filter(|s| s.venue_id == id);
    if slot.is_none() {
        return Err(ApiError::NotFound("Slot not found".into()));
    }
    match VenueSlot::delete_if_free(&state.db, slot_id).await? {
        Some(true) => {
            info!(venue_id = %id, %slot_id, "slot deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Some(false) => Err(ApiError::Conflict("Cannot delete a booked slot".into())),
        None => Err(ApiError::NotFound("Slot not found".into())),
    }
}
