use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    domain::{Gender, Role},
    users::repo::User,
};

/// Public part of a user returned to clients. Never carries the hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub gender: Gender,
    pub role: Role,
    pub phone: Option<String>,
    pub skill_level: Option<String>,
    pub rating: f64,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            gender: u.gender,
            role: u.role,
            phone: u.phone,
            skill_level: u.skill_level,
            rating: u.rating,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub skill_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    10
}

impl Pagination {
    /// Clamped to 1..=100; raw query values go straight into LIMIT and a
    /// negative or huge limit is a Postgres error, not a client error.
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_apply() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit(), 10);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn pagination_clamps_negative_and_oversized_values() {
        let p: Pagination = serde_json::from_str(r#"{"limit":-1,"offset":-5}"#).unwrap();
        assert_eq!(p.limit(), 1);
        assert_eq!(p.offset(), 0);

        let p: Pagination = serde_json::from_str(r#"{"limit":100000,"offset":20}"#).unwrap();
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 20);
    }
}
