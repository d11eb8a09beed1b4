use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::webhook::WebhookPayload;
use super::{Outcome, plan_update};
use crate::error::ShopError;
use crate::store::{Order, OrderStore, Store};
use crate::upstream::{
    MAX_BATCH_IDS, OrderStatusReport, ProviderRegistry, StatusLookup, UpstreamGateway,
};

/// Result of a batch pull-sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SyncSummary {
    pub checked: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn Store>,
    providers: ProviderRegistry,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn Store>, providers: ProviderRegistry) -> Self {
        Self { store, providers }
    }

    fn gateway(&self, provider: &str) -> Result<Arc<dyn UpstreamGateway>, ShopError> {
        self.providers
            .get(provider)
            .ok_or_else(|| ShopError::Internal(format!("provider '{}' is not configured", provider)))
    }

    /// Apply one report with a compare-and-swap on the order version
    pub async fn apply_report(
        &self,
        order: Order,
        report: &OrderStatusReport,
    ) -> Result<Outcome, ShopError> {
        let Some(progress) = plan_update(&order, report, Utc::now()) else {
            debug!(order_id = order.id, status = %report.status, "Report already applied or ignored");
            return Ok(Outcome::Unchanged(order));
        };

        let from = order.status;
        let updated = self
            .store
            .apply_progress(order.id, order.version, progress)
            .await?;
        info!(
            order_id = updated.id,
            upstream_order_id = ?updated.upstream_order_id,
            from = %from,
            to = %updated.status,
            current_count = updated.current_count,
            "Order reconciled"
        );
        Ok(Outcome::Updated(updated))
    }

    /// Pull the latest status for one order; upstream failure mutates nothing
    pub async fn sync_order(&self, order: Order) -> Result<Outcome, ShopError> {
        let Some(upstream_id) = order.upstream_order_id else {
            return Err(ShopError::validation(format!(
                "Order {} has not been submitted upstream",
                order.id
            )));
        };
        let gateway = self.gateway(&order.provider)?;
        let report = gateway.get_order_status(upstream_id).await.map_err(|e| {
            warn!(order_id = order.id, upstream_order_id = upstream_id, error = %e, "Status poll failed");
            e
        })?;
        self.apply_report(order, &report).await
    }

    /// Apply a verified webhook for `provider`
    pub async fn apply_webhook(
        &self,
        provider: &str,
        payload: &WebhookPayload,
    ) -> Result<Outcome, ShopError> {
        let order = self
            .store
            .find_by_upstream_id(provider, payload.order)
            .await?
            .ok_or_else(|| {
                ShopError::NotFound(format!("Upstream order {} for {}", payload.order, provider))
            })?;
        self.apply_report(order, &payload.to_report()).await
    }

    /// Pull-sync up to `limit` active orders, batched per provider
    pub async fn sync_active(&self, limit: i64) -> Result<SyncSummary, ShopError> {
        let orders = self.store.list_syncable(None, limit).await?;
        let mut by_provider: BTreeMap<String, Vec<Order>> = BTreeMap::new();
        for order in orders {
            by_provider.entry(order.provider.clone()).or_default().push(order);
        }

        let mut summary = SyncSummary::default();
        for (provider, orders) in by_provider {
            let Some(gateway) = self.providers.get(&provider) else {
                warn!(provider = %provider, count = orders.len(), "Skipping orders of unknown provider");
                summary.checked += orders.len();
                summary.failed += orders.len();
                continue;
            };
            for chunk in orders.chunks(MAX_BATCH_IDS) {
                self.sync_chunk(gateway.as_ref(), chunk, &mut summary).await;
            }
        }

        info!(
            checked = summary.checked,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "Active order sync finished"
        );
        Ok(summary)
    }

    async fn sync_chunk(
        &self,
        gateway: &dyn UpstreamGateway,
        chunk: &[Order],
        summary: &mut SyncSummary,
    ) {
        summary.checked += chunk.len();
        let ids: Vec<i64> = chunk.iter().filter_map(|o| o.upstream_order_id).collect();

        let mut lookups = match gateway.get_multiple_order_statuses(&ids).await {
            Ok(map) => map,
            Err(e) => {
                warn!(provider = gateway.name(), count = ids.len(), error = %e, "Batch status poll failed");
                summary.failed += chunk.len();
                return;
            }
        };

        for order in chunk {
            let lookup = order.upstream_order_id.and_then(|id| lookups.remove(&id));
            let report = match lookup {
                Some(StatusLookup::Found(report)) => report,
                Some(StatusLookup::Error { error }) => {
                    warn!(order_id = order.id, error = %error, "Provider has no status for order");
                    summary.failed += 1;
                    continue;
                }
                None => {
                    summary.failed += 1;
                    continue;
                }
            };
            match self.apply_report(order.clone(), &report).await {
                Ok(Outcome::Updated(_)) => summary.updated += 1,
                Ok(Outcome::Unchanged(_)) => summary.unchanged += 1,
                Err(e) => {
                    warn!(order_id = order.id, error = %e, "Failed to apply polled status");
                    summary.failed += 1;
                }
            }
        }
    }
}
