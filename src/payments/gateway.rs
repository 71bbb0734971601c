//! Payment gateway integration stub.
//!
//! The gateway is configured (keys, webhook secret, base url) but no wire
//! calls are made: checkout happens on the gateway's hosted page and the
//! outcome comes back through the webhook.

use rand::{distributions::Alphanumeric, Rng};
use time::OffsetDateTime;

use crate::config::PaymentGatewayConfig;

pub struct PaymentGateway {
    config: PaymentGatewayConfig,
}

impl PaymentGateway {
    pub fn new(config: PaymentGatewayConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty() && !self.config.webhook_secret.is_empty()
    }

    /// Hosted-checkout URL for a payment reference.
    pub fn checkout_url(&self, reference: &str) -> String {
        format!(
            "{}/checkout/{}?key={}",
            self.config.base_url.trim_end_matches('/'),
            reference,
            self.config.api_key
        )
    }

    pub fn verify_webhook_signature(&self, signature: &str) -> bool {
        !self.config.webhook_secret.is_empty() && signature == self.config.webhook_secret
    }
}

/// Unique reference for an external payment: `PREFIX_<unix-ms>_<9 alnum>`.
pub fn generate_reference(prefix: &str) -> String {
    let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("{prefix}_{millis}_{suffix}")
}

/// Normalize a monetary amount to two decimals. Negative and non-finite
/// amounts are rejected.
pub fn normalize_amount(amount: f64) -> Option<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    Some((amount * 100.0).round() / 100.0)
}
