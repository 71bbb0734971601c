use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::guard::CurrentUser,
    error::ApiError,
    state::AppState,
    users::{
        dto::{Pagination, PublicUser, UpdateProfileRequest},
        repo::User,
    },
    validate::{is_valid_phone, is_valid_skill_level},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/me", patch(update_me))
        .route("/users/:id", get(get_user))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users))
}

#[instrument(skip(state, user))]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PublicUser>, ApiError> {
    let row = User::find_by_id(&state.db, user.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(row.into()))
}

/// Public profile of another user, e.g. a fellow match player.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    let row = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Some(name) = payload.name.as_deref() {
        if name.trim().len() < 2 {
            return Err(ApiError::Validation(
                "Name must be at least 2 characters long".into(),
            ));
        }
    }
    if let Some(phone) = payload.phone.as_deref() {
        if !is_valid_phone(phone) {
            return Err(ApiError::Validation("Invalid phone number".into()));
        }
    }
    if let Some(level) = payload.skill_level.as_deref() {
        if !is_valid_skill_level(level) {
            return Err(ApiError::Validation("Invalid skill level".into()));
        }
    }

    let row = User::update_profile(
        &state.db,
        user.sub,
        payload.name.as_deref().map(str::trim),
        payload.phone.as_deref(),
        payload.skill_level.as_deref(),
    )
    .await
    .map_err(ApiError::from)?;

    info!(user_id = %row.id, "profile updated");
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let rows = User::list(&state.db, p.limit(), p.offset()).await?;
    Ok(Json(rows.into_iter().map(PublicUser::from).collect()))
}
