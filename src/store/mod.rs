//! Order Store and user accounts
//!
//! Two backends implement the same traits: [`PgStore`] for production and
//! [`MemoryStore`] for tests and database-less local runs. Compound
//! operations (debit + insert, cancel + credit, refund + credit) are atomic
//! in both.

pub mod memory;
pub mod models;
pub mod pg;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ShopError;

pub use memory::MemoryStore;
pub use models::{
    NewOrder, NewUser, Order, OrderFilter, OrderProgress, OrderStatus, PageRequest, Role,
    StoreStats, User, UserPatch,
};
pub use pg::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Conflict` if the username or email is taken
    async fn create_user(&self, new: NewUser) -> Result<User, ShopError>;

    async fn get_user(&self, id: i64) -> Result<User, ShopError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ShopError>;

    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), ShopError>;

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User, ShopError>;

    /// `Conflict` while the user still owns orders
    async fn delete_user(&self, id: i64) -> Result<(), ShopError>;

    /// Conditional decrement; returns the new balance
    async fn debit(&self, user_id: i64, amount: Decimal) -> Result<Decimal, ShopError>;

    /// Unconditional increment; returns the new balance
    async fn credit(&self, user_id: i64, amount: Decimal) -> Result<Decimal, ShopError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Debit `total_price` and insert a `pending` order in one transaction
    async fn insert_order_with_debit(&self, new: NewOrder) -> Result<Order, ShopError>;

    async fn get_order(&self, id: i64) -> Result<Order, ShopError>;

    async fn find_by_upstream_id(
        &self,
        provider: &str,
        upstream_order_id: i64,
    ) -> Result<Option<Order>, ShopError>;

    /// Newest first, with the total row count for the filter
    async fn list_orders(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, i64), ShopError>;

    /// Non-terminal orders with an upstream id, least recently updated first
    async fn list_syncable(
        &self,
        provider: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Order>, ShopError>;

    /// `pending` without upstream id → `in_progress` with `upstream_order_id`;
    /// `Conflict` if the order is no longer in that state
    async fn attach_upstream(&self, id: i64, upstream_order_id: i64) -> Result<Order, ShopError>;

    async fn set_notes(&self, id: i64, notes: Option<String>) -> Result<Order, ShopError>;

    /// Compare-and-swap on `version`; `Conflict` if another writer won
    async fn apply_progress(
        &self,
        id: i64,
        expected_version: i64,
        progress: OrderProgress,
    ) -> Result<Order, ShopError>;

    /// `pending|in_progress` → `cancelled` and credit `total_price`, atomically
    async fn cancel_with_refund(&self, id: i64) -> Result<Order, ShopError>;

    /// `cancelled` with nothing refunded → `refunded` and credit `total_price`
    async fn refund_cancelled(&self, id: i64) -> Result<Order, ShopError>;

    /// Manual status / notes edit, compare-and-swap on `version`;
    /// `Conflict` if the order changed since it was read
    async fn admin_update(
        &self,
        id: i64,
        expected_version: i64,
        status: Option<OrderStatus>,
        notes: Option<String>,
    ) -> Result<Order, ShopError>;

    async fn stats(&self) -> Result<StoreStats, ShopError>;
}

/// Everything the services need from persistence
pub trait Store: UserStore + OrderStore {}

impl<T: UserStore + OrderStore> Store for T {}

pub(crate) fn order_not_found(id: i64) -> ShopError {
    ShopError::NotFound(format!("Order {}", id))
}

pub(crate) fn user_not_found(id: i64) -> ShopError {
    ShopError::NotFound(format!("User {}", id))
}

pub(crate) fn not_cancellable(order: &Order) -> ShopError {
    ShopError::Validation(format!(
        "Order {} cannot be cancelled in status {}",
        order.id, order.status
    ))
}

pub(crate) fn not_refundable(order: &Order) -> ShopError {
    if order.status == OrderStatus::Cancelled {
        ShopError::Conflict(format!("Order {} has already been refunded", order.id))
    } else {
        ShopError::Validation(format!(
            "Order {} cannot be refunded in status {}",
            order.id, order.status
        ))
    }
}
