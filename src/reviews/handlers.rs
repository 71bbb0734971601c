use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::guard::CurrentUser,
    error::ApiError,
    reviews::{
        dto::{valid_rating, CreateReviewRequest},
        repo::Review,
    },
    state::AppState,
    users::dto::Pagination,
    venues::repo::Venue,
};

const MAX_COMMENT_LEN: usize = 1000;

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(create_review))
        .route("/venues/:id/reviews", get(list_venue_reviews))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    if !valid_rating(payload.rating) {
        return Err(ApiError::Validation(
            "Rating must be between 1 and 5".into(),
        ));
    }
    let comment = payload
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if comment.is_some_and(|c| c.len() > MAX_COMMENT_LEN) {
        return Err(ApiError::Validation("Comment is too long".into()));
    }
    if Venue::find_by_id(&state.db, payload.venue_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Venue not found".into()));
    }

    let review = Review::create(&state.db, caller.sub, payload.venue_id, payload.rating, comment)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("You have already reviewed this venue".into())
            }
            _ => ApiError::from(e),
        })?;
    info!(review_id = %review.id, venue_id = %review.venue_id, "review created");
    Ok((StatusCode::CREATED, Json(review)))
}

#[instrument(skip(state))]
pub async fn list_venue_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Review>>, ApiError> {
    if Venue::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Venue not found".into()));
    }
    Ok(Json(
        Review::list_by_venue(&state.db, id, p.limit(), p.offset()).await?,
    ))
}
