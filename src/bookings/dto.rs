use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::bookings::CANCELLATION_CUTOFF_HOURS;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub slot_id: Uuid,
}

/// A booking may only be canceled while the slot start is further away than
/// the cutoff.
pub fn cancellation_allowed(slot_starts_at: OffsetDateTime, now: OffsetDateTime) -> bool {
    slot_starts_at - now > Duration::hours(CANCELLATION_CUTOFF_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_allowed_well_before_start() {
        let now = OffsetDateTime::now_utc();
        assert!(cancellation_allowed(now + Duration::hours(5), now));
        assert!(cancellation_allowed(now + Duration::days(2), now));
    }

    #[test]
    fn cancellation_blocked_inside_cutoff() {
        let now = OffsetDateTime::now_utc();
        assert!(!cancellation_allowed(now + Duration::hours(4), now));
        assert!(!cancellation_allowed(now + Duration::hours(1), now));
        assert!(!cancellation_allowed(now - Duration::hours(1), now));
    }
}
