//! Provider status push

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use tracing::{info, warn};

use super::super::extract::ApiPath;
use super::super::state::AppState;
use super::super::types::{ApiResult, ok};
use crate::orders::OrderView;
use crate::reconcile::{SIGNATURE_HEADER, WebhookPayload, verify_signature};

/// Inbound status webhook
///
/// The raw body must carry `X-Webhook-Signature: hex(HMAC-SHA256(body, secret))`.
/// Redelivery of the same payload is a no-op.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/{provider}",
    params(
        ("provider" = String, Path, description = "Provider name as configured"),
        ("X-Webhook-Signature" = String, Header, description = "Hex HMAC-SHA256 of the body")
    ),
    request_body = WebhookPayload,
    responses(
        (status = 200, description = "Payload applied or already applied", body = OrderView),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Bad or missing signature"),
        (status = 404, description = "Unknown upstream order")
    ),
    tag = "Webhooks"
)]
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    ApiPath(provider): ApiPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<OrderView> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = verify_signature(state.webhook_secret.as_deref(), &body, signature) {
        warn!(provider = %provider, error = %e, "Webhook rejected");
        return Err(e);
    }

    let payload = WebhookPayload::parse(&body)?;
    let outcome = state.reconcile.apply_webhook(&provider, &payload).await?;
    info!(
        provider = %provider,
        upstream_order_id = payload.order,
        status = %payload.status,
        updated = outcome.is_updated(),
        "Webhook processed"
    );
    ok(outcome.order().into())
}
