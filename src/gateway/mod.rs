pub mod extract;
pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use anyhow::Context;
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::user_auth::{admin_middleware, jwt_auth_middleware};
use state::AppState;

/// Full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Auth Routes
    // ==========================================================================
    let auth_public = Router::new()
        .route("/register", post(crate::user_auth::handlers::register))
        .route("/login", post(crate::user_auth::handlers::login));

    let auth_private = Router::new()
        .route(
            "/profile",
            get(crate::user_auth::handlers::get_profile)
                .put(crate::user_auth::handlers::update_profile),
        )
        .route("/password", put(crate::user_auth::handlers::change_password))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Customer Routes - bearer token
    // ==========================================================================
    let customer_routes = Router::new()
        .route("/wallet/balance", get(handlers::get_balance))
        .route(
            "/orders",
            post(handlers::create_order).get(handlers::list_orders),
        )
        .route("/orders/{id}", get(handlers::get_order))
        .route("/orders/{id}/cancel", put(handlers::cancel_order))
        .route("/orders/{id}/sync", put(handlers::sync_order))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Admin Routes - bearer token + admin role
    // ==========================================================================
    let admin_routes = Router::new()
        .route("/users", get(handlers::admin::list_users))
        .route(
            "/users/{id}",
            get(handlers::admin::get_user)
                .put(handlers::admin::update_user)
                .delete(handlers::admin::delete_user),
        )
        .route("/users/{id}/credit", post(handlers::admin::credit_user))
        .route("/orders", get(handlers::admin::list_orders))
        .route("/orders/sync", post(handlers::admin::sync_orders))
        .route(
            "/orders/{id}",
            get(handlers::admin::get_order).put(handlers::admin::update_order),
        )
        .route("/orders/{id}/resubmit", post(handlers::admin::resubmit_order))
        .route("/orders/{id}/refund", post(handlers::admin::refund_order))
        .route("/stats", get(handlers::admin::stats))
        .nest("/providers/{provider}", provider_routes())
        .layer(from_fn(admin_middleware))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .route("/api/v1/services", get(handlers::list_services))
        .route("/api/v1/webhooks/{provider}", post(handlers::receive_webhook))
        .nest("/api/v1/auth", auth_public.merge(auth_private))
        .nest("/api/v1", customer_routes)
        .nest("/api/v1/admin", admin_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

fn provider_routes() -> Router<Arc<AppState>> {
    use handlers::providers;

    Router::new()
        .route("/balance", get(providers::balance))
        .route("/services", get(providers::services))
        .route("/orders/status", post(providers::order_statuses))
        .route("/orders/cancel", post(providers::cancel_orders))
        .route("/orders/refill", post(providers::refills))
        .route("/orders/{id}", get(providers::order_status))
        .route("/orders/{id}/refill", post(providers::refill))
        .route("/refills/status", post(providers::refill_statuses))
        .route("/refills/{id}", get(providers::refill_status))
}

/// Bind and serve until the process is stopped
pub async fn run_server(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} (is the port already in use?)", addr))?;

    info!(%addr, "Gateway listening");
    info!("API docs: http://{}/docs", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests;
