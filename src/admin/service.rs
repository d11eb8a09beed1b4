use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::types::{AdminUpdateOrderRequest, AdminUpdateUserRequest, StatsView};
use crate::error::ShopError;
use crate::store::{
    Order, OrderFilter, OrderStatus, OrderStore, PageRequest, Store, User, UserPatch, UserStore,
};
use crate::user_auth::service::normalize_email;
use crate::wallet::WalletLedger;

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Store>,
    wallet: WalletLedger,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>, wallet: WalletLedger) -> Self {
        Self { store, wallet }
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), ShopError> {
        self.store.list_users(page).await
    }

    pub async fn get_user(&self, id: i64) -> Result<User, ShopError> {
        self.store.get_user(id).await
    }

    pub async fn update_user(
        &self,
        id: i64,
        req: AdminUpdateUserRequest,
    ) -> Result<User, ShopError> {
        let patch = UserPatch {
            username: req.username.map(|u| u.trim().to_string()),
            email: req.email.as_deref().map(normalize_email),
            password_hash: None,
            role: req.role,
            is_active: req.is_active,
        };
        let user = self.store.update_user(id, patch).await?;
        info!(
            user_id = user.id,
            role = user.role.as_str(),
            is_active = user.is_active,
            "User updated by admin"
        );
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ShopError> {
        self.store.delete_user(id).await?;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Add funds to a wallet; the only way money enters the system
    pub async fn credit_user(&self, id: i64, amount: Decimal) -> Result<User, ShopError> {
        if amount <= Decimal::ZERO {
            return Err(ShopError::validation("amount must be positive"));
        }
        self.wallet.credit(id, amount).await?;
        self.store.get_user(id).await
    }

    // ========================================================================
    // Orders
    // ========================================================================

    pub async fn list_all_orders(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<(Vec<Order>, i64), ShopError> {
        let filter = OrderFilter {
            user_id: None,
            status,
        };
        self.store.list_orders(filter, page).await
    }

    pub async fn get_order(&self, id: i64) -> Result<Order, ShopError> {
        self.store.get_order(id).await
    }

    /// Manual status / notes override
    ///
    /// Terminal orders keep their status. Cancelling credits the wallet and
    /// refunding only applies to provider-cancelled orders, through the same
    /// store operations the order flow uses. Every write is conditional on
    /// the version read here.
    pub async fn update_order(
        &self,
        id: i64,
        req: AdminUpdateOrderRequest,
    ) -> Result<Order, ShopError> {
        let status = req
            .status
            .as_deref()
            .map(OrderStatus::from_str)
            .transpose()
            .map_err(ShopError::Validation)?;

        let current = self.store.get_order(id).await?;
        let Some(next) = status.filter(|next| *next != current.status) else {
            return self
                .store
                .admin_update(id, current.version, None, req.notes)
                .await;
        };

        let order = match next {
            OrderStatus::Refunded => self.store.refund_cancelled(id).await?,
            _ if current.status.is_terminal() => {
                return Err(ShopError::validation(format!(
                    "Order {} is {} and its status can no longer change",
                    id, current.status
                )));
            }
            OrderStatus::Cancelled => self.store.cancel_with_refund(id).await?,
            OrderStatus::InProgress if current.upstream_order_id.is_none() => {
                return Err(ShopError::validation(format!(
                    "Order {} has no upstream order; resubmit it instead",
                    id
                )));
            }
            other => {
                let order = self
                    .store
                    .admin_update(id, current.version, Some(other), req.notes.clone())
                    .await?;
                self.log_status_change(&current, &order);
                return Ok(order);
            }
        };
        self.log_status_change(&current, &order);

        match req.notes {
            Some(notes) => {
                self.store
                    .admin_update(id, order.version, None, Some(notes))
                    .await
            }
            None => Ok(order),
        }
    }

    fn log_status_change(&self, before: &Order, after: &Order) {
        info!(
            order_id = after.id,
            from = %before.status,
            to = %after.status,
            refunded = %after.refunded_amount,
            "Order status changed by admin"
        );
    }

    pub async fn stats(&self) -> Result<StatsView, ShopError> {
        Ok(self.store.stats().await?.into())
    }
}
