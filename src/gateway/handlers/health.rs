//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResponse, error_codes};

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Short commit hash the binary was built from
    #[schema(example = "a1b2c3d")]
    pub git_hash: &'static str,
    /// Configured upstream providers
    pub providers: Vec<String>,
}

/// Health check endpoint
///
/// Pings the database when one is configured. Does not call upstream
/// providers.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = ApiResponse<HealthResponse>, content_type = "application/json"),
        (status = 503, description = "Database unreachable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    if let Some(db) = &state.db {
        if let Err(e) = db.health_check().await {
            tracing::error!(error = %e, "Database health check failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    code: error_codes::SERVICE_UNAVAILABLE,
                    msg: "unavailable".to_string(),
                    data: None,
                }),
            );
        }
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthResponse {
            timestamp_ms: Utc::now().timestamp_millis(),
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("GIT_HASH"),
            providers: state.providers.names(),
        })),
    )
}
