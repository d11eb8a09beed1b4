//! Upstream Gateway
//!
//! One client for every SMM panel the storefront resells. Panels differ
//! only in how they encode id lists and whether they support refills,
//! both of which come from `ProviderConfig`.

pub mod client;
pub mod error;
pub mod registry;
pub mod types;

use async_trait::async_trait;
use std::collections::BTreeMap;

pub use client::PanelClient;
pub use error::UpstreamError;
pub use registry::ProviderRegistry;
pub use types::{
    BatchOutcome, NewUpstreamOrder, OrderStatusReport, ProviderBalance, ProviderStatus, Service,
    StatusLookup,
};

/// Maximum ids in one batch status / cancel / refill call
pub const MAX_BATCH_IDS: usize = 100;

/// Operations every upstream panel exposes
///
/// Batch operations reject empty lists and lists longer than
/// [`MAX_BATCH_IDS`] with `UpstreamError::Validation` before any request.
#[async_trait]
pub trait UpstreamGateway: Send + Sync {
    /// Provider name used in config, logs and stored orders
    fn name(&self) -> &str;

    async fn list_services(&self) -> Result<Vec<Service>, UpstreamError>;

    async fn get_balance(&self) -> Result<ProviderBalance, UpstreamError>;

    /// Place an order, returning the provider's order id
    async fn create_order(&self, order: &NewUpstreamOrder) -> Result<i64, UpstreamError>;

    async fn get_order_status(&self, order_id: i64) -> Result<OrderStatusReport, UpstreamError>;

    /// Per-id lookups; ids the provider does not know map to `StatusLookup::Error`
    async fn get_multiple_order_statuses(
        &self,
        order_ids: &[i64],
    ) -> Result<BTreeMap<i64, StatusLookup>, UpstreamError>;

    async fn cancel_orders(&self, order_ids: &[i64]) -> Result<Vec<BatchOutcome>, UpstreamError>;

    async fn create_refill(&self, order_id: i64) -> Result<i64, UpstreamError>;

    async fn create_refills(&self, order_ids: &[i64]) -> Result<Vec<BatchOutcome>, UpstreamError>;

    async fn get_refill_status(&self, refill_id: i64) -> Result<String, UpstreamError>;

    async fn get_refill_statuses(
        &self,
        refill_ids: &[i64],
    ) -> Result<Vec<BatchOutcome>, UpstreamError>;
}


#[cfg(test)]
pub use mock::MockGateway;
