use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub venue_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

/// Ratings are whole stars, 1 through 5.
pub fn valid_rating(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_must_be_one_to_five() {
        assert!(valid_rating(1));
        assert!(valid_rating(5));
        assert!(!valid_rating(0));
        assert!(!valid_rating(6));
        assert!(!valid_rating(-3));
    }

    #[test]
    fn create_request_uses_camel_case_keys() {
        let req: CreateReviewRequest = serde_json::from_str(
            r#"{"venueId":"7f4df1f2-9c75-4f7e-9f1e-0a4f5a3c2b1d","rating":4,"comment":"Great pitch"}"#,
        )
        .unwrap();
        assert_eq!(req.rating, 4);
        assert_eq!(req.comment.as_deref(), Some("Great pitch"));
    }
}
