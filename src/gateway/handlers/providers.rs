//! Provider console handlers
//!
//! Thin pass-throughs to one configured panel. Batch bodies carry at most
//! 100 ids.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;

use super::super::extract::{ApiPath, ValidatedJson};
use super::super::state::AppState;
use super::super::types::{ApiResult, ok};
use crate::admin::IdBatchRequest;
use crate::admin::providers::{RefillCreated, RefillStatusView};
use crate::upstream::{BatchOutcome, OrderStatusReport, ProviderBalance, Service, StatusLookup};

#[utoipa::path(
    get,
    path = "/api/v1/admin/providers/{provider}/balance",
    params(("provider" = String, Path, description = "Provider name")),
    responses(
        (status = 200, description = "Provider account balance", body = ProviderBalance),
        (status = 404, description = "Provider not configured")
    ),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
pub async fn balance(
    State(state): State<Arc<AppState>>,
    ApiPath(provider): ApiPath<String>,
) -> ApiResult<ProviderBalance> {
    ok(state.providers.balance(&provider).await?)
}

/// Raw catalog with provider rates
#[utoipa::path(
    get,
    path = "/api/v1/admin/providers/{provider}/services",
    params(("provider" = String, Path, description = "Provider name")),
    responses((status = 200, description = "Upstream services", body = Vec<Service>)),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
pub async fn services(
    State(state): State<Arc<AppState>>,
    ApiPath(provider): ApiPath<String>,
) -> ApiResult<Vec<Service>> {
    ok(state.providers.services(&provider).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/providers/{provider}/orders/{id}",
    params(
        ("provider" = String, Path, description = "Provider name"),
        ("id" = i64, Path, description = "Upstream order id")
    ),
    responses((status = 200, description = "Upstream order status", body = OrderStatusReport)),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
pub async fn order_status(
    State(state): State<Arc<AppState>>,
    ApiPath((provider, id)): ApiPath<(String, i64)>,
) -> ApiResult<OrderStatusReport> {
    ok(state.providers.order_status(&provider, id).await?)
}

/// Status of up to 100 upstream orders, keyed by id
#[utoipa::path(
    post,
    path = "/api/v1/admin/providers/{provider}/orders/status",
    params(("provider" = String, Path, description = "Provider name")),
    request_body = IdBatchRequest,
    responses(
        (status = 200, description = "Per-id status or error, keyed by order id"),
        (status = 400, description = "Empty batch or more than 100 ids")
    ),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
pub async fn order_statuses(
    State(state): State<Arc<AppState>>,
    ApiPath(provider): ApiPath<String>,
    ValidatedJson(req): ValidatedJson<IdBatchRequest>,
) -> ApiResult<BTreeMap<i64, StatusLookup>> {
    ok(state.providers.order_statuses(&provider, &req.ids).await?)
}

/// Cancel upstream orders; local orders are not changed
#[utoipa::path(
    post,
    path = "/api/v1/admin/providers/{provider}/orders/cancel",
    params(("provider" = String, Path, description = "Provider name")),
    request_body = IdBatchRequest,
    responses((status = 200, description = "Per-id outcome", body = Vec<BatchOutcome>)),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
pub async fn cancel_orders(
    State(state): State<Arc<AppState>>,
    ApiPath(provider): ApiPath<String>,
    ValidatedJson(req): ValidatedJson<IdBatchRequest>,
) -> ApiResult<Vec<BatchOutcome>> {
    ok(state.providers.cancel_orders(&provider, &req.ids).await?)
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/providers/{provider}/orders/{id}/refill",
    params(
        ("provider" = String, Path, description = "Provider name"),
        ("id" = i64, Path, description = "Upstream order id")
    ),
    responses(
        (status = 200, description = "Refill created", body = RefillCreated),
        (status = 400, description = "Provider does not support refills")
    ),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
pub async fn refill(
    State(state): State<Arc<AppState>>,
    ApiPath((provider, id)): ApiPath<(String, i64)>,
) -> ApiResult<RefillCreated> {
    ok(state.providers.refill(&provider, id).await?)
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/providers/{provider}/orders/refill",
    params(("provider" = String, Path, description = "Provider name")),
    request_body = IdBatchRequest,
    responses((status = 200, description = "Per-id refill id or error", body = Vec<BatchOutcome>)),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
pub async fn refills(
    State(state): State<Arc<AppState>>,
    ApiPath(provider): ApiPath<String>,
    ValidatedJson(req): ValidatedJson<IdBatchRequest>,
) -> ApiResult<Vec<BatchOutcome>> {
    ok(state.providers.refills(&provider, &req.ids).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/providers/{provider}/refills/{id}",
    params(
        ("provider" = String, Path, description = "Provider name"),
        ("id" = i64, Path, description = "Refill id")
    ),
    responses((status = 200, description = "Refill status", body = RefillStatusView)),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
pub async fn refill_status(
    State(state): State<Arc<AppState>>,
    ApiPath((provider, id)): ApiPath<(String, i64)>,
) -> ApiResult<RefillStatusView> {
    ok(state.providers.refill_status(&provider, id).await?)
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/providers/{provider}/refills/status",
    params(("provider" = String, Path, description = "Provider name")),
    request_body = IdBatchRequest,
    responses((status = 200, description = "Per-id refill status or error", body = Vec<BatchOutcome>)),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
pub async fn refill_statuses(
    State(state): State<Arc<AppState>>,
    ApiPath(provider): ApiPath<String>,
    ValidatedJson(req): ValidatedJson<IdBatchRequest>,
) -> ApiResult<Vec<BatchOutcome>> {
    ok(state.providers.refill_statuses(&provider, &req.ids).await?)
}
