use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{GenderCategory, MatchStatus, SportType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub venue_id: Option<Uuid>,
    pub sport: SportType,
    pub gender_category: GenderCategory,
    pub starts_at: OffsetDateTime,
    pub capacity: i32,
    pub status: MatchStatus,
    pub created_at: OffsetDateTime,
}

const MATCH_COLUMNS: &str =
    "id, creator_id, venue_id, sport, gender_category, starts_at, capacity, status, created_at";

impl Match {
    /// Open matches visible to a user: MIXED plus their own single-gender
    /// category.
    pub async fn list_visible(
        db: &PgPool,
        own_category: GenderCategory,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Match>> {
        let rows = sqlx::query_as::<_, Match>(&format!(
            r#"
            SELECT {MATCH_COLUMNS} FROM matches
            WHERE status = 'OPEN'
              AND (gender_category = 'MIXED' OR gender_category = $1)
            ORDER BY starts_at ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(own_category)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Match>> {
        let row = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn create(
        db: &PgPool,
        creator_id: Uuid,
        venue_id: Option<Uuid>,
        sport: SportType,
        gender_category: GenderCategory,
        starts_at: OffsetDateTime,
        capacity: i32,
    ) -> anyhow::Result<Match> {
        let mut tx = db.begin().await?;
        let row = sqlx::query_as::<_, Match>(&format!(
            r#"
            INSERT INTO matches (creator_id, venue_id, sport, gender_category, starts_at, capacity, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'OPEN')
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(creator_id)
        .bind(venue_id)
        .bind(sport)
        .bind(gender_category)
        .bind(starts_at)
        .bind(capacity)
        .fetch_one(&mut *tx)
        .await?;
        // Creator is the first player.
        sqlx::query("INSERT INTO match_players (match_id, user_id) VALUES ($1, $2)")
            .bind(row.id)
            .bind(creator_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn player_count(db: &PgPool, match_id: Uuid) -> anyhow::Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM match_players WHERE match_id = $1")
                .bind(match_id)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn is_player(db: &PgPool, match_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM match_players WHERE match_id = $1 AND user_id = $2)",
        )
        .bind(match_id)
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    /// Enroll a player and flip the match to FULL when capacity is reached.
    /// Openness and the seat count are re-checked under a row lock, so two
    /// joins racing for the last seat serialize and the loser gets None.
    pub async fn add_player(db: &PgPool, match_id: Uuid, user_id: Uuid) -> sqlx::Result<Option<i64>> {
        let mut tx = db.begin().await?;
        let row: Option<(MatchStatus, i32)> =
            sqlx::query_as("SELECT status, capacity FROM matches WHERE id = $1 FOR UPDATE")
                .bind(match_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((status, capacity)) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM match_players WHERE match_id = $1")
                .bind(match_id)
                .fetch_one(&mut *tx)
                .await?;
        if !admits(status, count, capacity as i64) {
            tx.rollback().await?;
            return Ok(None);
        }
        sqlx::query("INSERT INTO match_players (match_id, user_id) VALUES ($1, $2)")
            .bind(match_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let count = count + 1;
        sqlx::query("UPDATE matches SET status = 'FULL' WHERE id = $1 AND capacity <= $2")
            .bind(match_id)
            .bind(count)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(count))
    }

    /// Drop a player and reopen a FULL match.
    pub async fn remove_player(db: &PgPool, match_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let mut tx = db.begin().await?;
        let res = sqlx::query("DELETE FROM match_players WHERE match_id = $1 AND user_id = $2")
            .bind(match_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        sqlx::query("UPDATE matches SET status = 'OPEN' WHERE id = $1 AND status = 'FULL'")
            .bind(match_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    pub async fn set_status(db: &PgPool, id: Uuid, status: MatchStatus) -> anyhow::Result<()> {
        sqlx::query("UPDATE matches SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(db)
            .await?;
        Ok(())
    }
}

/// Admission rule applied under the row lock in [`Match::add_player`].
pub(crate) fn admits(status: MatchStatus, players: i64, capacity: i64) -> bool {
    status == MatchStatus::Open && players < capacity
}
