//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::admin::providers::{RefillCreated, RefillStatusView};
use crate::admin::types::StatusCount;
use crate::admin::{
    AdminUpdateOrderRequest, AdminUpdateUserRequest, CreditRequest, IdBatchRequest, StatsView,
};
use crate::catalog::CatalogEntry;
use crate::gateway::handlers::{BalanceView, HealthResponse};
use crate::gateway::types::{DisplayAmount, Pagination, StrictDecimal};
use crate::orders::{CreateOrderRequest, OrderView};
use crate::reconcile::{SyncSummary, WebhookPayload};
use crate::store::{OrderStatus, Role};
use crate::upstream::{BatchOutcome, OrderStatusReport, ProviderBalance, Service};
use crate::user_auth::service::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::user_auth::UserView;

/// JWT bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Token from POST /api/v1/auth/login, sent as `Authorization: Bearer <token>`",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Panel Reseller API",
        version = "1.0.0",
        description = "Storefront for reselling SMM panel services: catalog, wallet, orders and provider reconciliation.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        // System
        crate::gateway::handlers::health::health_check,
        // Auth
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::get_profile,
        crate::user_auth::handlers::update_profile,
        crate::user_auth::handlers::change_password,
        // Storefront
        crate::gateway::handlers::catalog::list_services,
        crate::gateway::handlers::wallet::get_balance,
        crate::gateway::handlers::orders::create_order,
        crate::gateway::handlers::orders::list_orders,
        crate::gateway::handlers::orders::get_order,
        crate::gateway::handlers::orders::cancel_order,
        crate::gateway::handlers::orders::sync_order,
        crate::gateway::handlers::webhook::receive_webhook,
        // Admin
        crate::gateway::handlers::admin::list_users,
        crate::gateway::handlers::admin::get_user,
        crate::gateway::handlers::admin::update_user,
        crate::gateway::handlers::admin::delete_user,
        crate::gateway::handlers::admin::credit_user,
        crate::gateway::handlers::admin::list_orders,
        crate::gateway::handlers::admin::get_order,
        crate::gateway::handlers::admin::update_order,
        crate::gateway::handlers::admin::resubmit_order,
        crate::gateway::handlers::admin::refund_order,
        crate::gateway::handlers::admin::sync_orders,
        crate::gateway::handlers::admin::stats,
        // Provider console
        crate::gateway::handlers::providers::balance,
        crate::gateway::handlers::providers::services,
        crate::gateway::handlers::providers::order_status,
        crate::gateway::handlers::providers::order_statuses,
        crate::gateway::handlers::providers::cancel_orders,
        crate::gateway::handlers::providers::refill,
        crate::gateway::handlers::providers::refills,
        crate::gateway::handlers::providers::refill_status,
        crate::gateway::handlers::providers::refill_statuses,
    ),
    components(
        schemas(
            HealthResponse,
            CatalogEntry,
            BalanceView,
            DisplayAmount,
            StrictDecimal,
            Pagination,
            Role,
            OrderStatus,
            OrderView,
            CreateOrderRequest,
            RegisterRequest,
            LoginRequest,
            UpdateProfileRequest,
            ChangePasswordRequest,
            AuthResponse,
            UserView,
            WebhookPayload,
            AdminUpdateUserRequest,
            AdminUpdateOrderRequest,
            CreditRequest,
            IdBatchRequest,
            StatsView,
            StatusCount,
            SyncSummary,
            Service,
            ProviderBalance,
            OrderStatusReport,
            BatchOutcome,
            RefillCreated,
            RefillStatusView,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Health checks"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Catalog", description = "Marked-up service catalog (no auth required)"),
        (name = "Wallet", description = "Balance queries (auth required)"),
        (name = "Orders", description = "Order placement and tracking (auth required)"),
        (name = "Webhooks", description = "Signed status pushes from providers"),
        (name = "Admin", description = "Back office (admin role required)"),
        (name = "Providers", description = "Raw upstream panel calls (admin role required)")
    )
)]
pub struct ApiDoc;
