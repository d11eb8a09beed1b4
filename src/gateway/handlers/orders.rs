//! Customer order handlers

use std::sync::Arc;

use axum::{Extension, extract::State};

use super::super::extract::{ApiPath, ApiQuery, ValidatedJson};
use super::super::state::AppState;
use super::super::types::{ApiResult, CreatedResult, Paginated, created, ok};
use crate::orders::{CreateOrderRequest, ListOrdersQuery, OrderView};
use crate::store::PageRequest;
use crate::user_auth::AuthUser;

/// Place an order
///
/// Funds are reserved before the provider is called. If the provider
/// rejects the order it stays `pending` with the reason in `notes`.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderView),
        (status = 400, description = "Invalid parameters"),
        (status = 422, description = "Insufficient balance"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Unknown service")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<CreateOrderRequest>,
) -> CreatedResult<OrderView> {
    let order = state.orders.create_order(user.id, req).await?;
    created(order.into())
}

/// List the caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Page of orders", body = Paginated<OrderView>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Paginated<OrderView>> {
    let page = PageRequest::new(query.page, query.limit);
    let (orders, total) = state.orders.list_orders(user.id, page).await?;
    ok(Paginated::new(
        orders.iter().map(OrderView::from).collect(),
        page,
        total,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = OrderView),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<OrderView> {
    ok(state.orders.get_order(user.id, id).await?.into())
}

/// Cancel a pending or in-progress order and refund it
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled and refunded", body = OrderView),
        (status = 400, description = "Order can no longer be cancelled"),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<OrderView> {
    ok(state.orders.cancel_order(user.id, id).await?.into())
}

/// Refresh an order from its provider
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/sync",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order after reconciliation", body = OrderView),
        (status = 400, description = "Order has not been submitted upstream"),
        (status = 502, description = "Provider unreachable, order unchanged")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn sync_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<OrderView> {
    ok(state.orders.sync_order(user.id, id).await?.into())
}
