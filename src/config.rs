use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL; the in-memory store is used when absent
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Provider used for storefront orders; defaults to the first entry
    #[serde(default)]
    pub default_provider: Option<String>,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Environment variable holding the JWT secret
    #[serde(default)]
    pub jwt_secret_env: Option<String>,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PricingConfig {
    #[serde(default = "default_markup")]
    pub markup: Decimal,
}

fn default_markup() -> Decimal {
    Decimal::new(152, 2)
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            markup: default_markup(),
        }
    }
}

/// How a provider expects id lists (`orders`, `refills`) in the form body
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdListEncoding {
    /// `orders=1,2,3`
    #[default]
    Comma,
    /// `orders[0]=1&orders[1]=2`
    Indexed,
}

/// One upstream SMM panel
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub id_list_encoding: IdListEncoding,
    #[serde(default = "default_true")]
    pub supports_refill: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl ProviderConfig {
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub secret_env: Option<String>,
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)?;
        config.resolve_secrets(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config yaml")
    }

    /// Resolve every `*_env` indirection once, at startup
    pub fn resolve_secrets<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.auth.jwt_secret.is_none() {
            if let Some(var) = &self.auth.jwt_secret_env {
                self.auth.jwt_secret = lookup(var);
            }
        }
        if self.webhook.secret.is_none() {
            if let Some(var) = &self.webhook.secret_env {
                self.webhook.secret = lookup(var);
            }
        }
        for provider in &mut self.providers {
            if provider.api_key.is_none() {
                if let Some(var) = &provider.api_key_env {
                    provider.api_key = lookup(var);
                }
            }
            if provider.api_key().is_empty() {
                bail!("provider '{}' has no API key configured", provider.name);
            }
        }
        if self.pricing.markup <= Decimal::ZERO {
            bail!("pricing.markup must be positive");
        }
        Ok(())
    }

    /// Name of the provider storefront orders go to
    pub fn default_provider_name(&self) -> Option<&str> {
        self.default_provider
            .as_deref()
            .or_else(|| self.providers.first().map(|p| p.name.as_str()))
    }
}
