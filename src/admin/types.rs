use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::gateway::types::{DisplayAmount, StrictDecimal};
use crate::pricing::display_amount;
use crate::store::{Role, StoreStats};
use crate::user_auth::service::validate_username;

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateUserRequest {
    #[validate(
        length(min = 3, max = 30, message = "username must be 3-30 characters"),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreditRequest {
    /// Positive amount as a decimal string
    #[schema(value_type = String, example = "25.00")]
    pub amount: StrictDecimal,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateOrderRequest {
    /// One of pending, in_progress, completed, cancelled, refunded
    #[schema(example = "completed")]
    pub status: Option<String>,
    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Order or refill ids for a batch provider call
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IdBatchRequest {
    #[validate(length(min = 1, max = 100, message = "between 1 and 100 ids are allowed"))]
    #[schema(example = json!([1001, 1002]))]
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsView {
    pub total_users: i64,
    pub total_orders: i64,
    pub orders_by_status: Vec<StatusCount>,
    /// Sum of completed order totals
    pub revenue: DisplayAmount,
}

impl From<StoreStats> for StatsView {
    fn from(s: StoreStats) -> Self {
        Self {
            total_users: s.total_users,
            total_orders: s.total_orders,
            orders_by_status: s
                .orders_by_status
                .into_iter()
                .map(|(status, count)| StatusCount {
                    status: status.as_str().to_string(),
                    count,
                })
                .collect(),
            revenue: display_amount(s.revenue),
        }
    }
}
