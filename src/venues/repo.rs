use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{GenderCategory, SportType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub sport: SportType,
    pub address: String,
    pub price_per_slot: f64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VenueSlot {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
    pub gender_category: GenderCategory,
    pub booked: bool,
}

const VENUE_COLUMNS: &str = "id, name, sport, address, price_per_slot, created_at";
const SLOT_COLUMNS: &str = "id, venue_id, starts_at, ends_at, gender_category, booked";

impl Venue {
    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Venue>> {
        let rows = sqlx::query_as::<_, Venue>(&format!(
            "SELECT {VENUE_COLUMNS} FROM venues ORDER BY name LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Venue>> {
        let row = sqlx::query_as::<_, Venue>(&format!(
            "SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn create(
        db: &PgPool,
        name: &str,
        sport: SportType,
        address: &str,
        price_per_slot: f64,
    ) -> anyhow::Result<Venue> {
        let row = sqlx::query_as::<_, Venue>(&format!(
            r#"
            INSERT INTO venues (name, sport, address, price_per_slot)
            VALUES ($1, $2, $3, $4)
            RETURNING {VENUE_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(sport)
        .bind(address)
        .bind(price_per_slot)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        address: Option<&str>,
        price_per_slot: Option<f64>,
    ) -> sqlx::Result<Venue> {
        sqlx::query_as::<_, Venue>(&format!(
            r#"
            UPDATE venues
            SET name = COALESCE($2, name),
                address = COALESCE($3, address),
                price_per_slot = COALESCE($4, price_per_slot)
            WHERE id = $1
            RETURNING {VENUE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(address)
        .bind(price_per_slot)
        .fetch_one(db)
        .await
    }
}

impl VenueSlot {
    /// Slots of a venue visible to a user: MIXED plus their own category.
    pub async fn list_visible(
        db: &PgPool,
        venue_id: Uuid,
        own_category: GenderCategory,
    ) -> anyhow::Result<Vec<VenueSlot>> {
        let rows = sqlx::query_as::<_, VenueSlot>(&format!(
            r#"
            SELECT {SLOT_COLUMNS} FROM venue_slots
            WHERE venue_id = $1
              AND (gender_category = 'MIXED' OR gender_category = $2)
            ORDER BY starts_at ASC
            "#
        ))
        .bind(venue_id)
        .bind(own_category)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<VenueSlot>> {
        let row = sqlx::query_as::<_, VenueSlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM venue_slots WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn create(
        db: &PgPool,
        venue_id: Uuid,
        starts_at: OffsetDateTime,
        ends_at: OffsetDateTime,
        gender_category: GenderCategory,
    ) -> anyhow::Result<VenueSlot> {
        let row = sqlx::query_as::<_, VenueSlot>(&format!(
            r#"
            INSERT INTO venue_slots (venue_id, starts_at, ends_at, gender_category)
            VALUES ($1, $2, $3, $4)
            RETURNING {SLOT_COLUMNS}
            "#
        ))
        .bind(venue_id)
        .bind(starts_at)
        .bind(ends_at)
        .bind(gender_category)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        starts_at: Option<OffsetDateTime>,
        ends_at: Option<OffsetDateTime>,
        gender_category: Option<GenderCategory>,
    ) -> sqlx::Result<VenueSlot> {
        sqlx::query_as::<_, VenueSlot>(&format!(
            r#"
            UPDATE venue_slots
            SET starts_at = COALESCE($2, starts_at),
                ends_at = COALESCE($3, ends_at),
                gender_category = COALESCE($4, gender_category)
            WHERE id = $1
            RETURNING {SLOT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(starts_at)
        .bind(ends_at)
        .bind(gender_category)
        .fetch_one(db)
        .await
    }

    /// Delete an unbooked slot. Returns false when the slot is booked.
    pub async fn delete_if_free(db: &PgPool, id: Uuid) -> anyhow::Result<Option<bool>> {
        let Some(slot) = Self::find_by_id(db, id).await? else {
            return Ok(None);
        };
        if slot.booked {
            return Ok(Some(false));
        }
        sqlx::query("DELETE FROM venue_slots WHERE id = $1 AND NOT booked")
            .bind(id)
            .execute(db)
            .await?;
        Ok(Some(true))
    }
}
