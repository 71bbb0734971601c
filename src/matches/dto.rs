use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    domain::{GenderCategory, MatchStatus, SportType},
    matches::repo::Match,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub venue_id: Option<Uuid>,
    pub sport: SportType,
    pub gender_category: GenderCategory,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    pub capacity: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub venue_id: Option<Uuid>,
    pub sport: SportType,
    pub gender_category: GenderCategory,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    pub capacity: i32,
    pub status: MatchStatus,
    pub players: i64,
}

impl MatchResponse {
    pub fn from_row(m: Match, players: i64) -> Self {
        Self {
            id: m.id,
            creator_id: m.creator_id,
            venue_id: m.venue_id,
            sport: m.sport,
            gender_category: m.gender_category,
            starts_at: m.starts_at,
            capacity: m.capacity,
            status: m.status,
            players,
        }
    }
}
