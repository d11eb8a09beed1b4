//! Back-office handlers for users, orders and stats

use std::sync::Arc;

use axum::extract::State;
use serde::Deserialize;
use utoipa::IntoParams;

use super::super::extract::{ApiPath, ApiQuery, ValidatedJson};
use super::super::state::AppState;
use super::super::types::{ApiResult, Paginated, ok};
use crate::admin::{AdminUpdateOrderRequest, AdminUpdateUserRequest, CreditRequest, StatsView};
use crate::error::ShopError;
use crate::orders::{ListOrdersQuery, OrderView};
use crate::reconcile::SyncSummary;
use crate::store::PageRequest;
use crate::user_auth::UserView;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number
    pub page: Option<i64>,
    /// Page size, 1-100
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SyncQuery {
    /// Maximum orders to check, 1-1000
    pub limit: Option<i64>,
}

const DEFAULT_SYNC_LIMIT: i64 = 200;
const MAX_SYNC_LIMIT: i64 = 1000;

// ============================================================================
// Users
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(PageQuery),
    responses((status = 200, description = "Page of users", body = Paginated<UserView>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Paginated<UserView>> {
    let page = PageRequest::new(query.page, query.limit);
    let (users, total) = state.admin.list_users(page).await?;
    ok(Paginated::new(
        users.iter().map(UserView::from).collect(),
        page,
        total,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserView),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<UserView> {
    ok(UserView::from(&state.admin.get_user(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserView),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username or email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<AdminUpdateUserRequest>,
) -> ApiResult<UserView> {
    ok(UserView::from(&state.admin.update_user(id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User still has orders")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    state.admin.delete_user(id).await?;
    ok(())
}

/// Add funds to a user's wallet
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/credit",
    params(("id" = i64, Path, description = "User id")),
    request_body = CreditRequest,
    responses(
        (status = 200, description = "User after credit", body = UserView),
        (status = 400, description = "Amount must be a positive decimal string"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn credit_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<CreditRequest>,
) -> ApiResult<UserView> {
    let user = state.admin.credit_user(id, req.amount.inner()).await?;
    ok(UserView::from(&user))
}

// ============================================================================
// Orders
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(ListOrdersQuery),
    responses((status = 200, description = "Page of orders", body = Paginated<OrderView>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Paginated<OrderView>> {
    let page = PageRequest::new(query.page, query.limit);
    let (orders, total) = state.admin.list_all_orders(page, query.status).await?;
    ok(Paginated::new(
        orders.iter().map(OrderView::from).collect(),
        page,
        total,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = OrderView),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<OrderView> {
    ok(state.admin.get_order(id).await?.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    request_body = AdminUpdateOrderRequest,
    responses(
        (status = 200, description = "Updated order", body = OrderView),
        (status = 400, description = "Unknown status, terminal order or disallowed transition"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order changed concurrently or already refunded")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<AdminUpdateOrderRequest>,
) -> ApiResult<OrderView> {
    ok(state.admin.update_order(id, req).await?.into())
}

/// Retry upstream submission of a pending order
#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/{id}/resubmit",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order submitted", body = OrderView),
        (status = 400, description = "Order is not awaiting submission"),
        (status = 502, description = "Provider rejected the order again")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn resubmit_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<OrderView> {
    ok(state.orders.resubmit_order(id).await?.into())
}

/// Refund an order the provider cancelled
#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/{id}/refund",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order refunded", body = OrderView),
        (status = 400, description = "Order is not cancelled"),
        (status = 409, description = "Order was already refunded")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn refund_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<OrderView> {
    ok(state.orders.refund_order(id).await?.into())
}

/// Pull-sync active orders from their providers
#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/sync",
    params(SyncQuery),
    responses((status = 200, description = "Sync summary", body = SyncSummary)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn sync_orders(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SyncQuery>,
) -> ApiResult<SyncSummary> {
    let limit = query.limit.unwrap_or(DEFAULT_SYNC_LIMIT);
    if !(1..=MAX_SYNC_LIMIT).contains(&limit) {
        return Err(ShopError::validation(format!(
            "limit must be between 1 and {}",
            MAX_SYNC_LIMIT
        )));
    }
    ok(state.reconcile.sync_active(limit).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses((status = 200, description = "Store statistics", body = StatsView)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<StatsView> {
    ok(state.admin.stats().await?)
}
