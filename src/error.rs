//! Storefront Error Types
//!
//! One error taxonomy for every layer below the HTTP handlers. Handlers
//! return `ShopError` directly; `IntoResponse` renders the unified envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::gateway::types::{ApiResponse, error_codes};
use crate::upstream::UpstreamError;

#[derive(Error, Debug)]
pub enum ShopError {
    // === Caller Errors ===
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Insufficient balance")]
    InsufficientFunds,

    #[error("{0}")]
    Conflict(String),

    // === Auth Errors ===
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    // === Dependency Errors ===
    #[error("Upstream provider error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ShopError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ShopError::NotFound(what.into())
    }

    /// Stable error code string for logs and clients
    pub fn code(&self) -> &'static str {
        match self {
            ShopError::Validation(_) => "VALIDATION_ERROR",
            ShopError::NotFound(_) => "NOT_FOUND",
            ShopError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ShopError::Conflict(_) => "CONFLICT",
            ShopError::Auth(_) => "AUTH_ERROR",
            ShopError::Forbidden(_) => "FORBIDDEN",
            ShopError::Upstream(_) => "UPSTREAM_ERROR",
            ShopError::Database(_) => "DATABASE_ERROR",
            ShopError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Numeric code carried in the response envelope
    pub fn api_code(&self) -> i32 {
        match self {
            ShopError::Validation(_) => error_codes::INVALID_PARAMETER,
            ShopError::NotFound(_) => error_codes::NOT_FOUND,
            ShopError::InsufficientFunds => error_codes::INSUFFICIENT_BALANCE,
            ShopError::Conflict(_) => error_codes::CONFLICT,
            ShopError::Auth(_) => error_codes::AUTH_FAILED,
            ShopError::Forbidden(_) => error_codes::FORBIDDEN,
            ShopError::Upstream(_) => error_codes::UPSTREAM_ERROR,
            ShopError::Database(_) | ShopError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ShopError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
            ShopError::Conflict(_) => StatusCode::CONFLICT,
            ShopError::Auth(_) => StatusCode::UNAUTHORIZED,
            ShopError::Forbidden(_) => StatusCode::FORBIDDEN,
            ShopError::Upstream(UpstreamError::Validation(_)) => StatusCode::BAD_REQUEST,
            ShopError::Upstream(UpstreamError::Unsupported(_)) => StatusCode::BAD_REQUEST,
            ShopError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ShopError::Database(_) | ShopError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to API clients
    fn public_message(&self) -> String {
        match self {
            ShopError::Database(_) | ShopError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for ShopError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    return ShopError::Conflict(format!(
                        "Duplicate value violates {}",
                        db_err.constraint().unwrap_or("a unique constraint")
                    ));
                }
                // foreign_key_violation
                Some("23503") => {
                    return ShopError::Conflict("Record is still referenced".to_string());
                }
                // check_violation
                Some("23514") => {
                    return ShopError::Validation(format!(
                        "Value violates {}",
                        db_err.constraint().unwrap_or("a check constraint")
                    ));
                }
                _ => {}
            }
        }
        if matches!(e, sqlx::Error::RowNotFound) {
            return ShopError::NotFound("Record".to_string());
        }
        ShopError::Database(e.to_string())
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }
        (
            status,
            Json(ApiResponse::<()>::error(self.api_code(), self.public_message())),
        )
            .into_response()
    }
}
