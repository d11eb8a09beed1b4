//! Panel Reseller gateway binary
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌──────────┐
//! │  Config  │───▶│  Store   │───▶│ AppState +   │───▶│  axum    │
//! │  (YAML)  │    │ (PG/mem) │    │ providers    │    │  server  │
//! └──────────┘    └──────────┘    └──────────────┘    └──────────┘
//! ```
//!
//! Flags: `--env/-e <name>` selects `config/<name>.yaml`, `--port <n>`
//! overrides `gateway.port`.

use anyhow::{Context, bail};
use std::sync::Arc;

use panel_reseller::config::AppConfig;
use panel_reseller::db::Database;
use panel_reseller::gateway::{run_server, state::AppState};
use panel_reseller::logging::init_logging;
use panel_reseller::pricing::PricingCalculator;
use panel_reseller::store::{MemoryStore, PgStore, Store};
use panel_reseller::upstream::ProviderRegistry;
use panel_reseller::user_auth::UserAuthService;

fn arg_value(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1).cloned())
}

fn get_env() -> String {
    arg_value(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    arg_value(&["--port"]).and_then(|p| p.parse().ok())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }
    let _log_guard = init_logging(&config);

    tracing::info!(env = %env, "Starting panel reseller gateway");

    let Some(jwt_secret) = config.auth.jwt_secret.clone().filter(|s| !s.is_empty()) else {
        bail!("auth.jwt_secret (or auth.jwt_secret_env) must be configured");
    };

    let (store, db): (Arc<dyn Store>, Option<Arc<Database>>) = match &config.postgres_url {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.init_schema()
                .await
                .context("Failed to initialise schema")?;
            tracing::info!("Using PostgreSQL store");
            let store: Arc<dyn Store> = Arc::new(PgStore::new(db.pool().clone()));
            (store, Some(Arc::new(db)))
        }
        None => {
            tracing::warn!("postgres_url not set, using in-memory store (data is lost on exit)");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            (store, None)
        }
    };

    let providers =
        ProviderRegistry::from_config(&config.providers, config.default_provider_name())?;
    if providers.is_empty() {
        tracing::warn!("No upstream providers configured; catalog and ordering are unavailable");
    } else {
        tracing::info!(providers = ?providers.names(), "Upstream providers registered");
    }
    if config.webhook.secret.is_none() {
        tracing::warn!("webhook secret not configured, inbound webhooks will be rejected");
    }

    let pricing = PricingCalculator::new(config.pricing.markup)?;
    let user_auth = UserAuthService::new(store.clone(), jwt_secret, config.auth.token_ttl_hours);

    let mut state = AppState::new(
        store,
        providers,
        pricing,
        user_auth,
        config.webhook.secret.clone(),
    );
    if let Some(db) = db {
        state = state.with_database(db);
    }

    run_server(Arc::new(state), &config.gateway.host, config.gateway.port).await
}
