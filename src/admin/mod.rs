//! Admin Service
//!
//! Back-office operations over users, orders and the upstream panels.
//! Every entry point is mounted behind the admin middleware.

pub mod providers;
pub mod service;
pub mod types;

pub use providers::ProviderConsole;
pub use service::AdminService;
pub use types::{
    AdminUpdateOrderRequest, AdminUpdateUserRequest, CreditRequest, IdBatchRequest, StatsView,
};
