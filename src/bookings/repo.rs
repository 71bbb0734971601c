use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::BookingStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub slot_id: Uuid,
    pub status: BookingStatus,
    pub created_at: OffsetDateTime,
}

const BOOKING_COLUMNS: &str = "id, user_id, slot_id, status, created_at";

impl Booking {
    /// Book a slot: insert the booking and flag the slot in one
    /// transaction. The unique index on slot_id (active bookings) rejects
    /// double booking.
    pub async fn create(db: &PgPool, user_id: Uuid, slot_id: Uuid) -> sqlx::Result<Booking> {
        let mut tx = db.begin().await?;
        let row = sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings (user_id, slot_id, status)
            VALUES ($1, $2, 'PENDING')
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(slot_id)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("UPDATE venue_slots SET booked = TRUE WHERE id = $1")
            .bind(slot_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Booking>> {
        let row = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Cancel a booking and free its slot.
    pub async fn cancel(db: &PgPool, id: Uuid, slot_id: Uuid) -> anyhow::Result<Booking> {
        let mut tx = db.begin().await?;
        let row = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings SET status = 'CANCELED'
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("UPDATE venue_slots SET booked = FALSE WHERE id = $1")
            .bind(slot_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row)
    }
}
