use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{ApiResult, ok};
use crate::catalog::CatalogEntry;

/// Storefront catalog
///
/// Read live from the default provider, priced with the configured markup.
#[utoipa::path(
    get,
    path = "/api/v1/services",
    responses(
        (status = 200, description = "Marked-up service list", body = Vec<CatalogEntry>),
        (status = 502, description = "Provider unreachable")
    ),
    tag = "Catalog"
)]
pub async fn list_services(State(state): State<Arc<AppState>>) -> ApiResult<Vec<CatalogEntry>> {
    ok(state.catalog.list().await?)
}
