use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::info;

use super::{PanelClient, UpstreamError, UpstreamGateway};
use crate::config::ProviderConfig;

/// Configured providers by name
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: FxHashMap<String, Arc<dyn UpstreamGateway>>,
    default: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a `PanelClient` per configured provider
    pub fn from_config(
        configs: &[ProviderConfig],
        default: Option<&str>,
    ) -> Result<Self, UpstreamError> {
        let mut registry = Self::new();
        for cfg in configs {
            let client = PanelClient::new(cfg)?;
            info!(provider = %cfg.name, base_url = %cfg.base_url, "Registered upstream provider");
            registry.register(Arc::new(client));
        }
        if let Some(name) = default {
            registry.set_default(name)?;
        }
        Ok(registry)
    }

    /// The first registered provider becomes the default
    pub fn register(&mut self, gateway: Arc<dyn UpstreamGateway>) {
        let name = gateway.name().to_string();
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.providers.insert(name, gateway);
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), UpstreamError> {
        if !self.providers.contains_key(name) {
            return Err(UpstreamError::Validation(format!(
                "unknown default provider '{}'",
                name
            )));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn UpstreamGateway>> {
        self.providers.get(name).cloned()
    }

    pub fn default_provider(&self) -> Option<Arc<dyn UpstreamGateway>> {
        self.default.as_deref().and_then(|n| self.get(n))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
