use std::sync::Arc;

use crate::admin::{AdminService, ProviderConsole};
use crate::catalog::Catalog;
use crate::db::Database;
use crate::orders::OrderService;
use crate::pricing::PricingCalculator;
use crate::reconcile::ReconciliationEngine;
use crate::store::Store;
use crate::upstream::ProviderRegistry;
use crate::user_auth::UserAuthService;
use crate::wallet::WalletLedger;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Present only when running against PostgreSQL
    pub db: Option<Arc<Database>>,
    pub catalog: Catalog,
    pub wallet: WalletLedger,
    pub orders: OrderService,
    pub reconcile: ReconciliationEngine,
    pub user_auth: Arc<UserAuthService>,
    pub admin: AdminService,
    pub providers: ProviderConsole,
    /// HMAC key for inbound webhooks; `None` rejects every webhook
    pub webhook_secret: Option<String>,
}

impl AppState {
    /// Wire every service over one store and one provider registry
    pub fn new(
        store: Arc<dyn Store>,
        providers: ProviderRegistry,
        pricing: PricingCalculator,
        user_auth: UserAuthService,
        webhook_secret: Option<String>,
    ) -> Self {
        let catalog = Catalog::new(providers.clone(), pricing);
        let wallet = WalletLedger::new(store.clone());
        let reconcile = ReconciliationEngine::new(store.clone(), providers.clone());
        let orders = OrderService::new(
            store.clone(),
            catalog.clone(),
            providers.clone(),
            reconcile.clone(),
        );
        let admin = AdminService::new(store.clone(), wallet.clone());
        Self {
            store,
            db: None,
            catalog,
            wallet,
            orders,
            reconcile,
            user_auth: Arc::new(user_auth),
            admin,
            providers: ProviderConsole::new(providers),
            webhook_secret,
        }
    }

    pub fn with_database(mut self, db: Arc<Database>) -> Self {
        self.db = Some(db);
        self
    }
}
