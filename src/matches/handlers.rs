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
    domain::{MatchStatus, Role},
    error::ApiError,
    matches::{
        dto::{CreateMatchRequest, MatchResponse},
        repo::Match,
    },
    policy,
    state::AppState,
    users::dto::Pagination,
};

pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/:id", get(get_match))
        .route("/matches/:id/join", post(join_match))
        .route("/matches/:id/leave", post(leave_match))
        .route("/matches/:id/cancel", post(cancel_match))
}

/// Loads a match the caller is allowed to see. Hidden categories surface as
/// Forbidden, absence as NotFound.
async fn load_viewable(
    state: &AppState,
    caller: &crate::auth::jwt::Claims,
    id: Uuid,
) -> Result<Match, ApiError> {
    let m = Match::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Match not found".into()))?;
    if !policy::can_view(caller.gender, m.gender_category) {
        warn!(user_id = %caller.sub, match_id = %id, "match not visible to caller");
        return Err(ApiError::Forbidden(
            "Your gender does not have access to this resource".into(),
        ));
    }
    Ok(m)
}

#[instrument(skip(state, caller))]
pub async fn list_matches(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<MatchResponse>>, ApiError> {
    let rows = Match::list_visible(
        &state.db,
        policy::own_category(caller.gender),
        p.limit(),
        p.offset(),
    )
    .await?;
    let mut out = Vec::with_capacity(rows.len());
    for m in rows {
        let players = Match::player_count(&state.db, m.id).await?;
        out.push(MatchResponse::from_row(m, players));
    }
    Ok(Json(out))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_match(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchResponse>), ApiError> {
    if payload.capacity < 2 {
        return Err(ApiError::Validation("Capacity must be at least 2".into()));
    }
    if payload.starts_at <= OffsetDateTime::now_utc() {
        return Err(ApiError::Validation("Match must start in the future".into()));
    }
    if !policy::can_join(caller.gender, payload.gender_category) {
        return Err(ApiError::Forbidden(
            "You cannot create a match you are not eligible to join".into(),
        ));
    }

    let m = Match::create(
        &state.db,
        caller.sub,
        payload.venue_id,
        payload.sport,
        payload.gender_category,
        payload.starts_at,
        payload.capacity,
    )
    .await?;
    info!(match_id = %m.id, creator = %caller.sub, "match created");
    Ok((StatusCode::CREATED, Json(MatchResponse::from_row(m, 1))))
}

#[instrument(skip(state, caller))]
pub async fn get_match(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchResponse>, ApiError> {
    let m = load_viewable(&state, &caller, id).await?;
    let players = Match::player_count(&state.db, m.id).await?;
    Ok(Json(MatchResponse::from_row(m, players)))
}

#[instrument(skip(state, caller))]
pub async fn join_match(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchResponse>, ApiError> {
    let m = load_viewable(&state, &caller, id).await?;

    if !policy::can_join(caller.gender, m.gender_category) {
        return Err(ApiError::Forbidden(
            "Your gender does not have access to this resource".into(),
        ));
    }
    if m.status != MatchStatus::Open {
        return Err(ApiError::Conflict("Match is not open for joining".into()));
    }
    if Match::is_player(&state.db, m.id, caller.sub).await? {
        return Err(ApiError::Conflict("Already joined this match".into()));
    }

    let players = Match::add_player(&state.db, m.id, caller.sub)
        .await
        .map_err(|e| match &e {
            // Concurrent double join: the unique pair index is the arbiter.
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("Already joined this match".into())
            }
            _ => ApiError::from(e),
        })?
        // The in-transaction re-check lost the race for the last seat.
        .ok_or_else(|| ApiError::Conflict("Match is not open for joining".into()))?;

    let m = Match::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Match not found".into()))?;
    info!(match_id = %id, user_id = %caller.sub, players, "player joined");
    Ok(Json(MatchResponse::from_row(m, players)))
}

#[instrument(skip(state, caller))]
pub async fn leave_match(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchResponse>, ApiError> {
    let m = load_viewable(&state, &caller, id).await?;
    if m.creator_id == caller.sub {
        return Err(ApiError::Conflict(
            "The creator cannot leave; cancel the match instead".into(),
        ));
    }
    if !Match::remove_player(&state.db, m.id, caller.sub).await? {
        return Err(ApiError::NotFound("You are not part of this match".into()));
    }
    let m = Match::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Match not found".into()))?;
    let players = Match::player_count(&state.db, m.id).await?;
    info!(match_id = %id, user_id = %caller.sub, "player left");
    Ok(Json(MatchResponse::from_row(m, players)))
}

#[instrument(skip(state, caller))]
pub async fn cancel_match(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchResponse>, ApiError> {
    let m = Match::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Match not found".into()))?;
    if m.creator_id != caller.sub && caller.role != Role::Admin {
        return Err(ApiError::Forbidden(
            "Only the creator or an admin can cancel a match".into(),
        ));
    }
    if matches!(m.status, MatchStatus::Completed | MatchStatus::Canceled) {
        return Err(ApiError::Conflict("Match is already finished".into()));
    }
    Match::set_status(&state.db, m.id, MatchStatus::Canceled).await?;
    let players = Match::player_count(&state.db, m.id).await?;
    info!(match_id = %id, by = %caller.sub, "match canceled");
    Ok(Json(MatchResponse::from_row(
        Match {
            status: MatchStatus::Canceled,
            ..m
        },
        players,
    )))
}
