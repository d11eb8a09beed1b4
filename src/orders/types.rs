use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::gateway::types::DisplayAmount;
use crate::pricing::display_amount;
use crate::store::{Order, OrderStatus};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[schema(example = 1)]
    pub service_id: i64,
    #[validate(length(min = 1, max = 2048, message = "link must be 1-2048 characters"))]
    #[schema(example = "https://instagram.com/example")]
    pub link: String,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    #[schema(example = 1000)]
    pub quantity: i64,
    /// Drip-feed runs
    #[validate(range(min = 1, message = "runs must be positive"))]
    pub runs: Option<i64>,
    /// Drip-feed interval in minutes
    #[validate(range(min = 1, message = "interval must be positive"))]
    pub interval: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersQuery {
    /// 1-based page number
    pub page: Option<i64>,
    /// Page size, 1-100
    pub limit: Option<i64>,
    /// Filter by status (admin listing only)
    pub status: Option<OrderStatus>,
}

/// Order as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderView {
    pub id: i64,
    pub user_id: i64,
    pub provider: String,
    pub service_id: i64,
    pub link: String,
    pub quantity: i64,
    pub total_price: DisplayAmount,
    pub status: OrderStatus,
    pub upstream_order_id: Option<i64>,
    pub start_count: Option<i64>,
    pub current_count: i64,
    pub remains: Option<i64>,
    pub upstream_status: Option<String>,
    pub refunded_amount: DisplayAmount,
    pub completion_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderView {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            provider: o.provider.clone(),
            service_id: o.service_id,
            link: o.link.clone(),
            quantity: o.quantity,
            total_price: display_amount(o.total_price),
            status: o.status,
            upstream_order_id: o.upstream_order_id,
            start_count: o.start_count,
            current_count: o.current_count,
            remains: o.remains,
            upstream_status: o.upstream_status.clone(),
            refunded_amount: display_amount(o.refunded_amount),
            completion_date: o.completion_date,
            notes: o.notes.clone(),
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

impl From<Order> for OrderView {
    fn from(o: Order) -> Self {
        OrderView::from(&o)
    }
}
