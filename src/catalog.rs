//! Storefront service catalog
//!
//! Services are read live from the default provider on every request and
//! never persisted; only the marked-up price is exposed to customers.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use crate::error::ShopError;
use crate::gateway::types::DisplayAmount;
use crate::pricing::{PricingCalculator, display_amount};
use crate::upstream::{ProviderRegistry, Service, UpstreamGateway};

/// Customer-facing view of an upstream service
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    /// Marked-up price per 1000 units
    pub price_per_1000: DisplayAmount,
    pub min: i64,
    pub max: i64,
    pub refill: bool,
    pub cancel: bool,
}

#[derive(Clone)]
pub struct Catalog {
    providers: ProviderRegistry,
    pricing: PricingCalculator,
}

impl Catalog {
    pub fn new(providers: ProviderRegistry, pricing: PricingCalculator) -> Self {
        Self { providers, pricing }
    }

    pub fn pricing(&self) -> &PricingCalculator {
        &self.pricing
    }

    /// Gateway used for storefront orders
    pub fn default_gateway(&self) -> Result<Arc<dyn UpstreamGateway>, ShopError> {
        self.providers
            .default_provider()
            .ok_or_else(|| ShopError::Internal("no upstream provider configured".to_string()))
    }

    /// Services whose marked-up price cannot be represented are left out
    pub async fn list(&self) -> Result<Vec<CatalogEntry>, ShopError> {
        let services = self.default_gateway()?.list_services().await?;
        Ok(services.iter().filter_map(|s| self.entry(s)).collect())
    }

    /// Upstream service by id, from a fresh catalog read
    pub async fn find_service(
        &self,
        gateway: &dyn UpstreamGateway,
        service_id: i64,
    ) -> Result<Service, ShopError> {
        gateway
            .list_services()
            .await?
            .into_iter()
            .find(|s| s.id == service_id)
            .ok_or_else(|| ShopError::NotFound(format!("Service {}", service_id)))
    }

    fn entry(&self, service: &Service) -> Option<CatalogEntry> {
        let Some(price) = self.pricing.unit_price(service) else {
            warn!(
                service_id = service.id,
                rate = %service.rate,
                "Skipping service with out-of-range rate"
            );
            return None;
        };
        Some(CatalogEntry {
            id: service.id,
            name: service.name.clone(),
            kind: service.kind.clone(),
            category: service.category.clone(),
            price_per_1000: display_amount(price),
            min: service.min,
            max: service.max,
            refill: service.refill,
            cancel: service.cancel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::MockGateway;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn catalog() -> Catalog {
        let gateway = MockGateway::new("followiz")
            .with_service(1, dec!(0.90), 50, 10_000)
            .with_service(2, dec!(2.00), 10, 500);
        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(gateway));
        Catalog::new(providers, PricingCalculator::default())
    }

    #[tokio::test]
    async fn test_list_applies_markup() {
        let entries = catalog().list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].price_per_1000.as_str(), "1.37");
        assert_eq!(entries[1].price_per_1000.as_str(), "3.04");
    }

    #[tokio::test]
    async fn test_find_service() {
        let catalog = catalog();
        let gw = catalog.default_gateway().unwrap();
        assert_eq!(catalog.find_service(gw.as_ref(), 2).await.unwrap().max, 500);
        assert!(matches!(
            catalog.find_service(gw.as_ref(), 99).await,
            Err(ShopError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_skips_unpriceable_service() {
        let gateway = MockGateway::new("followiz")
            .with_service(1, dec!(0.90), 50, 10_000)
            .with_service(2, Decimal::MAX, 10, 500);
        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(gateway));
        let catalog = Catalog::new(providers, PricingCalculator::default());

        let entries = catalog.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 1);
    }

    #[tokio::test]
    async fn test_no_provider() {
        let catalog = Catalog::new(ProviderRegistry::new(), PricingCalculator::default());
        assert!(matches!(catalog.list().await, Err(ShopError::Internal(_))));
    }
}
