use std::sync::Arc;
use tracing::{error, info, warn};

use super::types::CreateOrderRequest;
use crate::catalog::Catalog;
use crate::error::ShopError;
use crate::reconcile::ReconciliationEngine;
use crate::store::{
    NewOrder, Order, OrderFilter, OrderStatus, OrderStore, PageRequest, Store, not_cancellable,
};
use crate::upstream::{NewUpstreamOrder, ProviderRegistry, UpstreamGateway};

/// Where an order ended up after an upstream submission attempt
enum Submission {
    Accepted(Order),
    /// Still `pending` with funds reserved; the cause is in `notes`
    Deferred(Order, ShopError),
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    catalog: Catalog,
    providers: ProviderRegistry,
    reconcile: ReconciliationEngine,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn Store>,
        catalog: Catalog,
        providers: ProviderRegistry,
        reconcile: ReconciliationEngine,
    ) -> Self {
        Self {
            store,
            catalog,
            providers,
            reconcile,
        }
    }

    /// Quote, reserve funds and submit upstream
    ///
    /// An upstream failure after the reservation does not fail the call:
    /// the order is returned `pending` with the provider error in `notes`.
    pub async fn create_order(
        &self,
        user_id: i64,
        req: CreateOrderRequest,
    ) -> Result<Order, ShopError> {
        let link = req.link.trim().to_string();
        if link.is_empty() {
            return Err(ShopError::validation("link must not be empty"));
        }

        let gateway = self.catalog.default_gateway()?;
        let service = self
            .catalog
            .find_service(gateway.as_ref(), req.service_id)
            .await?;
        let total_price = self.catalog.pricing().quote(&service, req.quantity)?;

        let order = self
            .store
            .insert_order_with_debit(NewOrder {
                user_id,
                provider: gateway.name().to_string(),
                service_id: service.id,
                link: link.clone(),
                quantity: req.quantity,
                total_price,
            })
            .await?;
        info!(
            order_id = order.id,
            user_id,
            service_id = service.id,
            quantity = order.quantity,
            total_price = %order.total_price,
            "Order reserved"
        );

        let upstream = NewUpstreamOrder {
            service: service.id,
            link,
            quantity: req.quantity,
            runs: req.runs,
            interval: req.interval,
        };
        match self.submit(gateway.as_ref(), order, &upstream).await {
            Submission::Accepted(order) | Submission::Deferred(order, _) => Ok(order),
        }
    }

    async fn submit(
        &self,
        gateway: &dyn UpstreamGateway,
        order: Order,
        upstream: &NewUpstreamOrder,
    ) -> Submission {
        let upstream_id = match gateway.create_order(upstream).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    order_id = order.id,
                    provider = gateway.name(),
                    error = %e,
                    "Upstream submission failed, order left pending"
                );
                let order = self
                    .annotate(order, format!("Upstream submission failed: {}", e))
                    .await;
                return Submission::Deferred(order, e.into());
            }
        };

        match self.store.attach_upstream(order.id, upstream_id).await {
            Ok(order) => {
                info!(
                    order_id = order.id,
                    upstream_order_id = upstream_id,
                    provider = gateway.name(),
                    "Order submitted upstream"
                );
                Submission::Accepted(order)
            }
            Err(e) => {
                error!(
                    order_id = order.id,
                    upstream_order_id = upstream_id,
                    error = %e,
                    "Failed to link upstream order, cancelling it upstream"
                );
                if let Err(cancel_err) = gateway.cancel_orders(&[upstream_id]).await {
                    warn!(
                        upstream_order_id = upstream_id,
                        error = %cancel_err,
                        "Compensating upstream cancel failed"
                    );
                }
                let order = self
                    .annotate(
                        order,
                        format!("Upstream order {} could not be linked: {}", upstream_id, e),
                    )
                    .await;
                Submission::Deferred(order, e)
            }
        }
    }

    /// Record `note` on a reserved order; a failed write keeps the order as it was
    async fn annotate(&self, order: Order, note: String) -> Order {
        match self.store.set_notes(order.id, Some(note)).await {
            Ok(order) => order,
            Err(e) => {
                error!(order_id = order.id, error = %e, "Failed to record order notes");
                order
            }
        }
    }

    async fn owned_order(&self, user_id: i64, order_id: i64) -> Result<Order, ShopError> {
        let order = self.store.get_order(order_id).await?;
        if order.user_id != user_id {
            return Err(ShopError::Forbidden(format!(
                "Order {} belongs to another user",
                order_id
            )));
        }
        Ok(order)
    }

    pub async fn get_order(&self, user_id: i64, order_id: i64) -> Result<Order, ShopError> {
        self.owned_order(user_id, order_id).await
    }

    /// Newest first
    pub async fn list_orders(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<Order>, i64), ShopError> {
        let filter = OrderFilter {
            user_id: Some(user_id),
            status: None,
        };
        self.store.list_orders(filter, page).await
    }

    /// Cancel upstream (best effort), then cancel and refund locally
    pub async fn cancel_order(&self, user_id: i64, order_id: i64) -> Result<Order, ShopError> {
        let order = self.owned_order(user_id, order_id).await?;
        if !order.status.is_cancellable() {
            return Err(not_cancellable(&order));
        }

        if let Some(upstream_id) = order.upstream_order_id {
            self.cancel_upstream(&order.provider, upstream_id).await;
        }

        let order = self.store.cancel_with_refund(order.id).await?;
        info!(
            order_id = order.id,
            user_id,
            refunded = %order.refunded_amount,
            "Order cancelled and refunded"
        );
        Ok(order)
    }

    async fn cancel_upstream(&self, provider: &str, upstream_id: i64) {
        let Some(gateway) = self.providers.get(provider) else {
            warn!(provider, upstream_order_id = upstream_id, "Provider not configured, skipping upstream cancel");
            return;
        };
        match gateway.cancel_orders(&[upstream_id]).await {
            Ok(outcomes) => {
                for outcome in outcomes.iter().filter(|o| !o.is_ok()) {
                    warn!(
                        provider,
                        upstream_order_id = outcome.id,
                        error = ?outcome.error,
                        "Upstream refused cancel"
                    );
                }
            }
            Err(e) => {
                warn!(provider, upstream_order_id = upstream_id, error = %e, "Upstream cancel failed");
            }
        }
    }

    /// Pull the latest upstream status for one of the user's orders
    pub async fn sync_order(&self, user_id: i64, order_id: i64) -> Result<Order, ShopError> {
        let order = self.owned_order(user_id, order_id).await?;
        Ok(self.reconcile.sync_order(order).await?.into_order())
    }

    /// Retry upstream creation for an order left `pending` by a failed submission
    pub async fn resubmit_order(&self, order_id: i64) -> Result<Order, ShopError> {
        let order = self.store.get_order(order_id).await?;
        if order.status != OrderStatus::Pending || order.upstream_order_id.is_some() {
            return Err(ShopError::validation(format!(
                "Order {} is not awaiting upstream submission",
                order_id
            )));
        }
        let gateway = self.providers.get(&order.provider).ok_or_else(|| {
            ShopError::Internal(format!("provider '{}' is not configured", order.provider))
        })?;

        let upstream = NewUpstreamOrder {
            service: order.service_id,
            link: order.link.clone(),
            quantity: order.quantity,
            runs: None,
            interval: None,
        };
        match self.submit(gateway.as_ref(), order, &upstream).await {
            Submission::Accepted(order) => Ok(order),
            Submission::Deferred(_, err) => Err(err),
        }
    }

    /// Refund an order the provider cancelled
    pub async fn refund_order(&self, order_id: i64) -> Result<Order, ShopError> {
        let order = self.store.refund_cancelled(order_id).await?;
        info!(
            order_id = order.id,
            user_id = order.user_id,
            refunded = %order.refunded_amount,
            "Cancelled order refunded"
        );
        Ok(order)
    }
}
