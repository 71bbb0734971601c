use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::guard::CurrentUser,
    bookings::repo::Booking,
    domain::{BookingStatus, PaymentStatus, Role},
    error::ApiError,
    matches::repo::Match,
    payments::{
        dto::{
            BookingPaymentRequest, MatchPaymentRequest, PaymentInitiatedResponse, WebhookOutcome,
            WebhookRequest,
        },
        gateway::{generate_reference, normalize_amount},
        repo::Payment,
    },
    state::AppState,
};

const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payments/booking", post(initiate_booking_payment))
        .route("/payments/match", post(initiate_match_payment))
        .route("/payments/status/:reference", get(payment_status))
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/payments/webhook", post(webhook))
}

fn initiated(state: &AppState, payment: &Payment) -> PaymentInitiatedResponse {
    PaymentInitiatedResponse {
        reference: payment.reference.clone(),
        checkout_url: state.payments.checkout_url(&payment.reference),
        status: payment.status,
    }
}

#[instrument(skip(state, caller, payload))]
pub async fn initiate_booking_payment(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(payload): Json<BookingPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentInitiatedResponse>), ApiError> {
    let amount = normalize_amount(payload.amount)
        .ok_or_else(|| ApiError::Validation("Invalid amount".into()))?;
    let booking = Booking::find_by_id(&state.db, payload.booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;
    if booking.user_id != caller.sub {
        return Err(ApiError::Forbidden("Not your booking".into()));
    }
    if booking.status != BookingStatus::Pending {
        return Err(ApiError::Conflict("Booking is not awaiting payment".into()));
    }

    let reference = generate_reference("BKG");
    let payment = Payment::create(
        &state.db,
        &reference,
        caller.sub,
        Some(booking.id),
        None,
        amount,
    )
    .await?;
    info!(reference = %payment.reference, booking_id = %booking.id, "booking payment initiated");
    Ok((StatusCode::CREATED, Json(initiated(&state, &payment))))
}

#[instrument(skip(state, caller, payload))]
pub async fn initiate_match_payment(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(payload): Json<MatchPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentInitiatedResponse>), ApiError> {
    let amount = normalize_amount(payload.amount)
        .ok_or_else(|| ApiError::Validation("Invalid amount".into()))?;
    let m = Match::find_by_id(&state.db, payload.match_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Match not found".into()))?;
    if !Match::is_player(&state.db, m.id, caller.sub).await? {
        return Err(ApiError::Forbidden(
            "Only players can pay for a match".into(),
        ));
    }

    let reference = generate_reference("MTC");
    let payment =
        Payment::create(&state.db, &reference, caller.sub, None, Some(m.id), amount).await?;
    info!(reference = %payment.reference, match_id = %m.id, "match payment initiated");
    Ok((StatusCode::CREATED, Json(initiated(&state, &payment))))
}

/// Gateway callback. Authenticated by the shared webhook secret, not by a
/// user token.
#[instrument(skip(state, headers, payload))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookRequest>,
) -> Result<Json<Payment>, ApiError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !state.payments.verify_webhook_signature(signature) {
        warn!("webhook signature rejected");
        return Err(ApiError::Unauthorized("Invalid webhook signature".into()));
    }

    let status = match payload.status {
        WebhookOutcome::Completed => PaymentStatus::Completed,
        WebhookOutcome::Failed => PaymentStatus::Failed,
    };
    // The settle is a single conditional transaction; only a still-PENDING
    // payment moves, and only a still-PENDING booking gets confirmed.
    let Some(payment) = Payment::settle(&state.db, &payload.reference, status).await? else {
        return match Payment::find_by_reference(&state.db, &payload.reference).await? {
            Some(_) => Err(ApiError::Conflict("Payment already settled".into())),
            None => Err(ApiError::NotFound("Payment not found".into())),
        };
    };

    info!(reference = %payment.reference, status = ?payment.status, "payment settled");
    Ok(Json(payment))
}

#[instrument(skip(state, caller))]
pub async fn payment_status(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(reference): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let payment = Payment::find_by_reference(&state.db, &reference)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment not found".into()))?;
    if payment.user_id != caller.sub && caller.role != Role::Admin {
        return Err(ApiError::Forbidden("Not your payment".into()));
    }
    Ok(Json(payment))
}
