//! Wallet Ledger
//!
//! Per-user balance. Debits are a single conditional update so the balance
//! can never go negative; transactional variants that pair a balance change
//! with an order write live on the store.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::error::ShopError;
use crate::store::{Store, UserStore};

#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<dyn Store>,
}

fn check_amount(amount: Decimal) -> Result<(), ShopError> {
    if amount.is_sign_negative() {
        return Err(ShopError::validation("amount must not be negative"));
    }
    Ok(())
}

impl WalletLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get_balance(&self, user_id: i64) -> Result<Decimal, ShopError> {
        Ok(self.store.get_user(user_id).await?.balance)
    }

    /// `InsufficientFunds` leaves the balance untouched
    pub async fn debit(&self, user_id: i64, amount: Decimal) -> Result<Decimal, ShopError> {
        check_amount(amount)?;
        let balance = self.store.debit(user_id, amount).await?;
        info!(user_id, %amount, %balance, "Wallet debited");
        Ok(balance)
    }

    pub async fn credit(&self, user_id: i64, amount: Decimal) -> Result<Decimal, ShopError> {
        check_amount(amount)?;
        let balance = self.store.credit(user_id, amount).await?;
        info!(user_id, %amount, %balance, "Wallet credited");
        Ok(balance)
    }
}
