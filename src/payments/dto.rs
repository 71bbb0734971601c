use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::PaymentStatus;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPaymentRequest {
    pub booking_id: Uuid,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPaymentRequest {
    pub match_id: Uuid,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiatedResponse {
    pub reference: String,
    pub checkout_url: String,
    pub status: PaymentStatus,
}

/// Gateway webhook body: outcome of a checkout by reference.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub reference: String,
    pub status: WebhookOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookOutcome {
    Completed,
    Failed,
}
