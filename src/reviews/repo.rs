use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub venue_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: OffsetDateTime,
}

const REVIEW_COLUMNS: &str = "id, user_id, venue_id, rating, comment, created_at";

impl Review {
    /// One review per user and venue; the unique pair index rejects a
    /// second one.
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        venue_id: Uuid,
        rating: i32,
        comment: Option<&str>,
    ) -> sqlx::Result<Review> {
        let row = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (user_id, venue_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(venue_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn list_by_venue(
        db: &PgPool,
        venue_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS} FROM reviews
            WHERE venue_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(venue_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
