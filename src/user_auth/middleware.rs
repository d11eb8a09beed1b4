use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::service::AuthUser;
use crate::error::ShopError;
use crate::gateway::state::AppState;

fn bearer_token(request: &Request<Body>) -> Result<&str, ShopError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ShopError::Auth("Missing Authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ShopError::Auth("Invalid token format".to_string()))
}

/// Bearer JWT → active user → `AuthUser` extension
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ShopError> {
    let token = bearer_token(&request)?;
    let user = state.user_auth.authenticate(token).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Must run after `jwt_auth_middleware`
pub async fn admin_middleware(request: Request<Body>, next: Next) -> Result<Response, ShopError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| ShopError::Auth("Not authenticated".to_string()))?;
    if !user.is_admin() {
        return Err(ShopError::Forbidden("Admin access required".to_string()));
    }
    Ok(next.run(request).await)
}
