//! Provider console: raw upstream calls for operators

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::error::ShopError;
use crate::upstream::{
    BatchOutcome, OrderStatusReport, ProviderBalance, ProviderRegistry, Service, StatusLookup,
    UpstreamGateway,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefillCreated {
    pub order_id: i64,
    pub refill_id: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefillStatusView {
    pub refill_id: i64,
    pub status: String,
}

#[derive(Clone)]
pub struct ProviderConsole {
    providers: ProviderRegistry,
}

impl ProviderConsole {
    pub fn new(providers: ProviderRegistry) -> Self {
        Self { providers }
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.names()
    }

    fn gateway(&self, provider: &str) -> Result<Arc<dyn UpstreamGateway>, ShopError> {
        self.providers
            .get(provider)
            .ok_or_else(|| ShopError::NotFound(format!("Provider '{}'", provider)))
    }

    pub async fn balance(&self, provider: &str) -> Result<ProviderBalance, ShopError> {
        Ok(self.gateway(provider)?.get_balance().await?)
    }

    /// Unmarked upstream catalog
    pub async fn services(&self, provider: &str) -> Result<Vec<Service>, ShopError> {
        Ok(self.gateway(provider)?.list_services().await?)
    }

    pub async fn order_status(
        &self,
        provider: &str,
        order_id: i64,
    ) -> Result<OrderStatusReport, ShopError> {
        Ok(self.gateway(provider)?.get_order_status(order_id).await?)
    }

    pub async fn order_statuses(
        &self,
        provider: &str,
        ids: &[i64],
    ) -> Result<BTreeMap<i64, StatusLookup>, ShopError> {
        Ok(self
            .gateway(provider)?
            .get_multiple_order_statuses(ids)
            .await?)
    }

    /// Upstream only; local orders are not touched
    pub async fn cancel_orders(
        &self,
        provider: &str,
        ids: &[i64],
    ) -> Result<Vec<BatchOutcome>, ShopError> {
        let outcomes = self.gateway(provider)?.cancel_orders(ids).await?;
        info!(
            provider,
            requested = ids.len(),
            accepted = outcomes.iter().filter(|o| o.is_ok()).count(),
            "Upstream cancel requested by admin"
        );
        Ok(outcomes)
    }

    pub async fn refill(&self, provider: &str, order_id: i64) -> Result<RefillCreated, ShopError> {
        let refill_id = self.gateway(provider)?.create_refill(order_id).await?;
        info!(provider, order_id, refill_id, "Refill requested");
        Ok(RefillCreated {
            order_id,
            refill_id,
        })
    }

    pub async fn refills(
        &self,
        provider: &str,
        ids: &[i64],
    ) -> Result<Vec<BatchOutcome>, ShopError> {
        let outcomes = self.gateway(provider)?.create_refills(ids).await?;
        info!(provider, requested = ids.len(), "Batch refill requested");
        Ok(outcomes)
    }

    pub async fn refill_status(
        &self,
        provider: &str,
        refill_id: i64,
    ) -> Result<RefillStatusView, ShopError> {
        let status = self.gateway(provider)?.get_refill_status(refill_id).await?;
        Ok(RefillStatusView { refill_id, status })
    }

    pub async fn refill_statuses(
        &self,
        provider: &str,
        ids: &[i64],
    ) -> Result<Vec<BatchOutcome>, ShopError> {
        Ok(self.gateway(provider)?.get_refill_statuses(ids).await?)
    }
}
