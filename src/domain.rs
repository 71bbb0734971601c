use serde::{Deserialize, Serialize};

/// A user's gender. Fixed at registration, sole input to the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "gender", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

/// Gender gate attached to matches and venue slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "gender_category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenderCategory {
    MaleOnly,
    FemaleOnly,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "sport_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SportType {
    Football,
    Padel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "match_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Open,
    Full,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Canceled,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_serialize_screaming_snake() {
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "\"MALE\"");
        assert_eq!(
            serde_json::to_string(&GenderCategory::MaleOnly).unwrap(),
            "\"MALE_ONLY\""
        );
        assert_eq!(
            serde_json::to_string(&GenderCategory::Mixed).unwrap(),
            "\"MIXED\""
        );
        assert_eq!(
            serde_json::to_string(&BookingStatus::Refunded).unwrap(),
            "\"REFUNDED\""
        );
    }

    #[test]
    fn enums_deserialize_from_wire_form() {
        let g: Gender = serde_json::from_str("\"FEMALE\"").unwrap();
        assert_eq!(g, Gender::Female);
        let c: GenderCategory = serde_json::from_str("\"FEMALE_ONLY\"").unwrap();
        assert_eq!(c, GenderCategory::FemaleOnly);
    }
}
