use std::sync::Arc;

use axum::{Extension, extract::State};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResult, DisplayAmount, ok};
use crate::pricing::display_amount;
use crate::user_auth::AuthUser;

#[derive(serde::Serialize, ToSchema)]
pub struct BalanceView {
    pub user_id: i64,
    #[schema(value_type = String, example = "12.50")]
    pub balance: DisplayAmount,
}

/// Current wallet balance
#[utoipa::path(
    get,
    path = "/api/v1/wallet/balance",
    responses(
        (status = 200, description = "Balance", body = BalanceView),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<BalanceView> {
    let balance = state.wallet.get_balance(user.id).await?;
    ok(BalanceView {
        user_id: user.id,
        balance: display_amount(balance),
    })
}
