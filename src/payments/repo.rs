use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::PaymentStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub reference: String,
    pub user_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub amount: f64,
    pub status: PaymentStatus,
    pub created_at: OffsetDateTime,
}

const PAYMENT_COLUMNS: &str =
    "id, reference, user_id, booking_id, match_id, amount, status, created_at";

impl Payment {
    pub async fn create(
        db: &PgPool,
        reference: &str,
        user_id: Uuid,
        booking_id: Option<Uuid>,
        match_id: Option<Uuid>,
        amount: f64,
    ) -> anyhow::Result<Payment> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (reference, user_id, booking_id, match_id, amount, status)
            VALUES ($1, $2, $3, $4, $5, 'PENDING')
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(reference)
        .bind(user_id)
        .bind(booking_id)
        .bind(match_id)
        .bind(amount)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn find_by_reference(
        db: &PgPool,
        reference: &str,
    ) -> anyhow::Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Settle a PENDING payment and, for a successful booking payment,
    /// confirm its booking. Both updates are conditional on the current
    /// status and share one transaction: a payment already settled is left
    /// alone (None), and a booking canceled while the gateway was processing
    /// stays canceled.
    pub async fn settle(
        db: &PgPool,
        reference: &str,
        status: PaymentStatus,
    ) -> anyhow::Result<Option<Payment>> {
        let mut tx = db.begin().await?;
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments SET status = $2
            WHERE reference = $1 AND status = 'PENDING'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(reference)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(payment) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        if payment.status == PaymentStatus::Completed {
            if let Some(booking_id) = payment.booking_id {
                sqlx::query(
                    "UPDATE bookings SET status = 'CONFIRMED' WHERE id = $1 AND status = 'PENDING'",
                )
                .bind(booking_id)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        Ok(Some(payment))
    }
}
