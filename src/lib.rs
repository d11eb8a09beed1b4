//! Panel Reseller - storefront backend for SMM panel services
//!
//! Customers buy social-media services that are fulfilled by upstream
//! panels (Followiz, TurkTakipcim). The storefront marks up the panel
//! rate, reserves funds in a per-user wallet, submits orders upstream and
//! keeps local order state in step with the provider.
//!
//! # Modules
//!
//! - [`pricing`] - markup pricing and quantity bounds
//! - [`wallet`] - per-user balance ledger
//! - [`store`] - users and orders (PostgreSQL or in-memory)
//! - [`upstream`] - unified panel client and provider registry
//! - [`reconcile`] - status mapping, pull-sync and signed webhooks
//! - [`catalog`] - customer-facing service list
//! - [`orders`] - order placement, cancellation and refunds
//! - [`user_auth`] - registration, login, JWT middleware
//! - [`admin`] - back office and provider console
//! - [`gateway`] - axum router, handlers, OpenAPI

// Ambient
pub mod config;
pub mod db;
pub mod error;
pub mod logging;

// Domain
pub mod catalog;
pub mod orders;
pub mod pricing;
pub mod reconcile;
pub mod store;
pub mod upstream;
pub mod wallet;

// Accounts and HTTP surface
pub mod admin;
pub mod gateway;
pub mod user_auth;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use error::ShopError;
pub use orders::OrderService;
pub use pricing::PricingCalculator;
pub use reconcile::ReconciliationEngine;
pub use store::{MemoryStore, Order, OrderStatus, PgStore, Store};
pub use upstream::{PanelClient, ProviderRegistry, UpstreamError, UpstreamGateway};
pub use wallet::WalletLedger;
