//! HTTP handlers
//!
//! Handlers stay thin: extract, call one service, wrap the result in the
//! envelope. Errors are `ShopError` and render themselves.

pub mod admin;
pub mod catalog;
pub mod health;
pub mod orders;
pub mod providers;
pub mod wallet;
pub mod webhook;

pub use catalog::list_services;
pub use health::{HealthResponse, health_check};
pub use orders::{cancel_order, create_order, get_order, list_orders, sync_order};
pub use wallet::{BalanceView, get_balance};
pub use webhook::receive_webhook;
