//! Database-backed checks for the race-sensitive write paths. They need a
//! live Postgres, so they are ignored by default:
//!
//!     DATABASE_URL=postgres://... cargo test -- --ignored

use sportspot::{
    bookings::repo::Booking,
    domain::{
        BookingStatus, Gender, GenderCategory, MatchStatus, PaymentStatus, Role, SportType,
    },
    matches::repo::Match,
    payments::repo::Payment,
    users::repo::{NewUser, User},
    venues::repo::{Venue, VenueSlot},
};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPool::connect(&url).await.expect("connect");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrate");
    pool
}

async fn make_user(db: &PgPool, gender: Gender) -> User {
    let email = format!("{}@test.local", Uuid::new_v4());
    User::create(
        db,
        NewUser {
            email: &email,
            password_hash: "not-a-real-hash",
            name: "Test Player",
            gender,
            role: Role::User,
            phone: None,
            skill_level: None,
        },
    )
    .await
    .expect("create user")
}

#[tokio::test]
#[ignore = "needs a live Postgres (DATABASE_URL)"]
async fn settlement_leaves_a_canceled_booking_canceled() {
    let db = pool().await;
    let user = make_user(&db, Gender::Male).await;
    let venue = Venue::create(&db, "Settle Park", SportType::Football, "1 Test Way", 50.0)
        .await
        .expect("venue");
    let starts = OffsetDateTime::now_utc() + Duration::days(2);
    let slot = VenueSlot::create(
        &db,
        venue.id,
        starts,
        starts + Duration::hours(1),
        GenderCategory::Mixed,
    )
    .await
    .expect("slot");
    let booking = Booking::create(&db, user.id, slot.id).await.expect("booking");
    let reference = format!("BKG_test_{}", Uuid::new_v4());
    Payment::create(&db, &reference, user.id, Some(booking.id), None, 50.0)
        .await
        .expect("payment");

    // The booking is canceled while the gateway still has the payment in
    // flight; the late success event must not resurrect it.
    Booking::cancel(&db, booking.id, slot.id).await.expect("cancel");

    let settled = Payment::settle(&db, &reference, PaymentStatus::Completed)
        .await
        .expect("settle")
        .expect("payment was pending");
    assert_eq!(settled.status, PaymentStatus::Completed);

    let booking = Booking::find_by_id(&db, booking.id)
        .await
        .expect("query")
        .expect("row");
    assert_eq!(booking.status, BookingStatus::Canceled);
    let slot = VenueSlot::find_by_id(&db, slot.id)
        .await
        .expect("query")
        .expect("row");
    assert!(!slot.booked);

    // A second delivery of the same event is a no-op.
    assert!(Payment::settle(&db, &reference, PaymentStatus::Failed)
        .await
        .expect("settle")
        .is_none());
    let payment = Payment::find_by_reference(&db, &reference)
        .await
        .expect("query")
        .expect("row");
    assert_eq!(payment.status, PaymentStatus::Completed);
}

#[tokio::test]
#[ignore = "needs a live Postgres (DATABASE_URL)"]
async fn concurrent_joins_cannot_exceed_capacity() {
    let db = pool().await;
    let creator = make_user(&db, Gender::Male).await;
    let m = Match::create(
        &db,
        creator.id,
        None,
        SportType::Padel,
        GenderCategory::Mixed,
        OffsetDateTime::now_utc() + Duration::days(1),
        2,
    )
    .await
    .expect("match");

    // The creator holds one of the two seats; both joins race for the last.
    let a = make_user(&db, Gender::Male).await;
    let b = make_user(&db, Gender::Female).await;
    let (ra, rb) = tokio::join!(
        Match::add_player(&db, m.id, a.id),
        Match::add_player(&db, m.id, b.id)
    );
    let admitted = [ra.expect("join a"), rb.expect("join b")]
        .into_iter()
        .flatten()
        .count();
    assert_eq!(admitted, 1);

    assert_eq!(Match::player_count(&db, m.id).await.expect("count"), 2);
    let m = Match::find_by_id(&db, m.id)
        .await
        .expect("query")
        .expect("row");
    assert_eq!(m.status, MatchStatus::Full);
}
