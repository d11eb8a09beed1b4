//! Order Service
//!
//! Orchestrates catalog lookup, pricing, the wallet reservation, upstream
//! submission and cancellation refunds.

pub mod service;
pub mod types;

#[cfg(test)]
mod integration_tests;

pub use service::OrderService;
pub use types::{CreateOrderRequest, ListOrdersQuery, OrderView};
