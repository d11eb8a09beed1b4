//! Inbound provider webhooks
//!
//! The body is authenticated with `X-Webhook-Signature: hex(HMAC-SHA256(body, secret))`
//! before it is parsed.

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use utoipa::ToSchema;

use crate::error::ShopError;
use crate::upstream::types::lenient;
use crate::upstream::{OrderStatusReport, ProviderStatus};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Status push from a provider
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct WebhookPayload {
    /// Upstream order id
    #[serde(deserialize_with = "lenient::int")]
    pub order: i64,
    #[schema(example = "In progress")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub remains: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub start_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    #[schema(value_type = Option<String>)]
    pub charge: Option<Decimal>,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> Result<Self, ShopError> {
        let payload: Self = serde_json::from_slice(body)
            .map_err(|e| ShopError::validation(format!("invalid webhook payload: {}", e)))?;
        if payload.status.trim().is_empty() {
            return Err(ShopError::validation("webhook status must not be empty"));
        }
        Ok(payload)
    }

    pub fn to_report(&self) -> OrderStatusReport {
        OrderStatusReport {
            status: ProviderStatus::from(self.status.as_str()),
            remains: self.remains,
            start_count: self.start_count,
            charge: self.charge,
            currency: None,
        }
    }
}

fn mac(secret: &[u8]) -> Result<HmacSha256, ShopError> {
    HmacSha256::new_from_slice(secret)
        .map_err(|e| ShopError::Internal(format!("invalid webhook secret: {}", e)))
}

/// Hex HMAC-SHA256 of `body`
pub fn sign_payload(secret: &[u8], body: &[u8]) -> Result<String, ShopError> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature; no secret means nothing verifies
pub fn verify_signature(
    secret: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), ShopError> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return Err(ShopError::Auth("Webhooks are not configured".to_string()));
    };
    let Some(signature) = signature else {
        return Err(ShopError::Auth("Missing webhook signature".to_string()));
    };
    let expected = hex::decode(signature.trim())
        .map_err(|_| ShopError::Auth("Malformed webhook signature".to_string()))?;

    let mut mac = mac(secret.as_bytes())?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| ShopError::Auth("Invalid webhook signature".to_string()))
}
