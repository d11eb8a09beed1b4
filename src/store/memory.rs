//! In-memory store
//!
//! A single mutex guards users and orders together, so every compound
//! operation is trivially atomic.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use super::models::*;
use super::{
    OrderStore, UserStore, not_cancellable, not_refundable, order_not_found, user_not_found,
};
use crate::error::ShopError;

#[derive(Default)]
struct Inner {
    users: FxHashMap<i64, User>,
    orders: FxHashMap<i64, Order>,
    /// (provider, upstream order id) → local order id
    upstream_index: FxHashMap<(String, i64), i64>,
    next_user_id: i64,
    next_order_id: i64,
    #[cfg(test)]
    fail_notes: bool,
}

impl Inner {
    fn user_mut(&mut self, id: i64) -> Result<&mut User, ShopError> {
        self.users.get_mut(&id).ok_or_else(|| user_not_found(id))
    }

    fn order_mut(&mut self, id: i64) -> Result<&mut Order, ShopError> {
        self.orders.get_mut(&id).ok_or_else(|| order_not_found(id))
    }

    fn check_unique(
        &self,
        skip_id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), ShopError> {
        for user in self.users.values() {
            if Some(user.id) == skip_id {
                continue;
            }
            if username.is_some_and(|u| u == user.username) {
                return Err(ShopError::Conflict("Username already taken".to_string()));
            }
            if email.is_some_and(|e| e == user.email) {
                return Err(ShopError::Conflict("Email already registered".to_string()));
            }
        }
        Ok(())
    }

    fn debit(&mut self, user_id: i64, amount: Decimal) -> Result<Decimal, ShopError> {
        let user = self.user_mut(user_id)?;
        if user.balance < amount {
            return Err(ShopError::InsufficientFunds);
        }
        user.balance -= amount;
        user.updated_at = Utc::now();
        Ok(user.balance)
    }

    fn credit(&mut self, user_id: i64, amount: Decimal) -> Result<Decimal, ShopError> {
        let user = self.user_mut(user_id)?;
        user.balance += amount;
        user.updated_at = Utc::now();
        Ok(user.balance)
    }
}

fn touch(order: &mut Order) {
    order.version += 1;
    order.updated_at = Utc::now();
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `set_notes` fail until reset
    #[cfg(test)]
    pub async fn set_fail_notes(&self, fail: bool) {
        self.inner.lock().await.fail_notes = fail;
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, ShopError> {
        let mut inner = self.inner.lock().await;
        inner.check_unique(None, Some(&new.username), Some(&new.email))?;

        inner.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.next_user_id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            balance: Decimal::ZERO,
            role: new.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<User, ShopError> {
        let inner = self.inner.lock().await;
        inner.users.get(&id).cloned().ok_or_else(|| user_not_found(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ShopError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), ShopError> {
        let inner = self.inner.lock().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| b.id.cmp(&a.id));
        let total = users.len() as i64;
        let users = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((users, total))
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User, ShopError> {
        let mut inner = self.inner.lock().await;
        inner.user_mut(id)?;
        inner.check_unique(Some(id), patch.username.as_deref(), patch.email.as_deref())?;

        let user = inner.user_mut(id)?;
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> Result<(), ShopError> {
        let mut inner = self.inner.lock().await;
        inner.user_mut(id)?;
        if inner.orders.values().any(|o| o.user_id == id) {
            return Err(ShopError::Conflict(
                "User has orders and cannot be deleted".to_string(),
            ));
        }
        inner.users.remove(&id);
        Ok(())
    }

    async fn debit(&self, user_id: i64, amount: Decimal) -> Result<Decimal, ShopError> {
        self.inner.lock().await.debit(user_id, amount)
    }

    async fn credit(&self, user_id: i64, amount: Decimal) -> Result<Decimal, ShopError> {
        self.inner.lock().await.credit(user_id, amount)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order_with_debit(&self, new: NewOrder) -> Result<Order, ShopError> {
        let mut inner = self.inner.lock().await;
        inner.debit(new.user_id, new.total_price)?;

        inner.next_order_id += 1;
        let now = Utc::now();
        let order = Order {
            id: inner.next_order_id,
            user_id: new.user_id,
            provider: new.provider,
            service_id: new.service_id,
            link: new.link,
            quantity: new.quantity,
            total_price: new.total_price,
            status: OrderStatus::Pending,
            upstream_order_id: None,
            start_count: None,
            current_count: 0,
            remains: None,
            upstream_status: None,
            refunded_amount: Decimal::ZERO,
            completion_date: None,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: i64) -> Result<Order, ShopError> {
        let inner = self.inner.lock().await;
        inner.orders.get(&id).cloned().ok_or_else(|| order_not_found(id))
    }

    async fn find_by_upstream_id(
        &self,
        provider: &str,
        upstream_order_id: i64,
    ) -> Result<Option<Order>, ShopError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .upstream_index
            .get(&(provider.to_string(), upstream_order_id))
            .and_then(|id| inner.orders.get(id))
            .cloned())
    }

    async fn list_orders(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, i64), ShopError> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| filter.user_id.is_none_or(|u| o.user_id == u))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = orders.len() as i64;
        let orders = orders
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((orders, total))
    }

    async fn list_syncable(
        &self,
        provider: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Order>, ShopError> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| !o.status.is_terminal() && o.upstream_order_id.is_some())
            .filter(|o| provider.is_none_or(|p| o.provider == p))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        orders.truncate(limit.max(0) as usize);
        Ok(orders)
    }

    async fn attach_upstream(&self, id: i64, upstream_order_id: i64) -> Result<Order, ShopError> {
        let mut inner = self.inner.lock().await;
        let key = (inner.order_mut(id)?.provider.clone(), upstream_order_id);
        if inner.upstream_index.get(&key).is_some_and(|&other| other != id) {
            return Err(ShopError::Conflict(format!(
                "Upstream order {} is already linked",
                upstream_order_id
            )));
        }

        let order = inner.order_mut(id)?;
        if order.status != OrderStatus::Pending || order.upstream_order_id.is_some() {
            return Err(ShopError::Conflict(format!(
                "Order {} is no longer awaiting submission",
                id
            )));
        }
        order.upstream_order_id = Some(upstream_order_id);
        order.status = OrderStatus::InProgress;
        touch(order);
        let order = order.clone();
        inner.upstream_index.insert(key, id);
        Ok(order)
    }

    async fn set_notes(&self, id: i64, notes: Option<String>) -> Result<Order, ShopError> {
        let mut inner = self.inner.lock().await;
        #[cfg(test)]
        {
            if inner.fail_notes {
                return Err(ShopError::Internal("notes write failed".to_string()));
            }
        }
        let order = inner.order_mut(id)?;
        order.notes = notes;
        touch(order);
        Ok(order.clone())
    }

    async fn apply_progress(
        &self,
        id: i64,
        expected_version: i64,
        progress: OrderProgress,
    ) -> Result<Order, ShopError> {
        let mut inner = self.inner.lock().await;
        let order = inner.order_mut(id)?;
        if order.version != expected_version {
            return Err(ShopError::Conflict(format!(
                "Order {} was modified concurrently",
                id
            )));
        }
        order.status = progress.status;
        order.start_count = progress.start_count;
        order.current_count = progress.current_count;
        order.remains = progress.remains;
        order.upstream_status = progress.upstream_status;
        order.completion_date = progress.completion_date;
        touch(order);
        Ok(order.clone())
    }

    async fn cancel_with_refund(&self, id: i64) -> Result<Order, ShopError> {
        let mut inner = self.inner.lock().await;
        let order = inner.order_mut(id)?;
        if !order.status.is_cancellable() {
            return Err(not_cancellable(order));
        }
        order.status = OrderStatus::Cancelled;
        order.refunded_amount = order.total_price;
        touch(order);
        let order = order.clone();
        inner.credit(order.user_id, order.total_price)?;
        Ok(order)
    }

    async fn refund_cancelled(&self, id: i64) -> Result<Order, ShopError> {
        let mut inner = self.inner.lock().await;
        let order = inner.order_mut(id)?;
        if order.status != OrderStatus::Cancelled || !order.refunded_amount.is_zero() {
            return Err(not_refundable(order));
        }
        order.status = OrderStatus::Refunded;
        order.refunded_amount = order.total_price;
        touch(order);
        let order = order.clone();
        inner.credit(order.user_id, order.total_price)?;
        Ok(order)
    }

    async fn admin_update(
        &self,
        id: i64,
        expected_version: i64,
        status: Option<OrderStatus>,
        notes: Option<String>,
    ) -> Result<Order, ShopError> {
        let mut inner = self.inner.lock().await;
        let order = inner.order_mut(id)?;
        if order.version != expected_version {
            return Err(ShopError::Conflict(format!(
                "Order {} was modified concurrently",
                id
            )));
        }
        if let Some(status) = status {
            if status == OrderStatus::Completed && order.completion_date.is_none() {
                order.completion_date = Some(Utc::now());
            }
            order.status = status;
        }
        if notes.is_some() {
            order.notes = notes;
        }
        touch(order);
        Ok(order.clone())
    }

    async fn stats(&self) -> Result<StoreStats, ShopError> {
        let inner = self.inner.lock().await;
        let orders_by_status = OrderStatus::ALL
            .into_iter()
            .map(|st| {
                let n = inner.orders.values().filter(|o| o.status == st).count() as i64;
                (st, n)
            })
            .collect();
        let revenue = inner
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Completed)
            .map(|o| o.total_price)
            .sum();
        Ok(StoreStats {
            total_users: inner.users.len() as i64,
            total_orders: inner.orders.len() as i64,
            orders_by_status,
            revenue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn store_with_user(balance: Decimal) -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        if !balance.is_zero() {
            store.credit(user.id, balance).await.unwrap();
        }
        (store, user.id)
    }

    fn new_order(user_id: i64, price: Decimal) -> NewOrder {
        NewOrder {
            user_id,
            provider: "followiz".to_string(),
            service_id: 1,
            link: "https://instagram.com/alice".to_string(),
            quantity: 1000,
            total_price: price,
        }
    }

    #[tokio::test]
    async fn test_duplicate_user_conflicts() {
        let (store, _) = store_with_user(Decimal::ZERO).await;
        let err = store
            .create_user(NewUser {
                username: "alice".to_string(),
                email: "other@example.com".to_string(),
                password_hash: "h".to_string(),
                role: Role::User,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_debit_credit_restores_balance() {
        let (store, uid) = store_with_user(dec!(10.00)).await;
        store.debit(uid, dec!(3.37)).await.unwrap();
        let balance = store.credit(uid, dec!(3.37)).await.unwrap();
        assert_eq!(balance, dec!(10.00));
    }

    #[tokio::test]
    async fn test_overdraft_rejected_balance_unchanged() {
        let (store, uid) = store_with_user(dec!(1.00)).await;
        let err = store.debit(uid, dec!(1.01)).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientFunds));
        assert_eq!(store.get_user(uid).await.unwrap().balance, dec!(1.00));
    }

    #[tokio::test]
    async fn test_insert_with_debit_is_all_or_nothing() {
        let (store, uid) = store_with_user(dec!(1.00)).await;
        let err = store
            .insert_order_with_debit(new_order(uid, dec!(1.368)))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InsufficientFunds));
        let (orders, total) = store
            .list_orders(OrderFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert!(orders.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_cancel_twice_refunds_once() {
        let (store, uid) = store_with_user(dec!(5.00)).await;
        let order = store
            .insert_order_with_debit(new_order(uid, dec!(1.368)))
            .await
            .unwrap();

        store.cancel_with_refund(order.id).await.unwrap();
        let err = store.cancel_with_refund(order.id).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
        assert_eq!(store.get_user(uid).await.unwrap().balance, dec!(5.00));
    }

    #[tokio::test]
    async fn test_apply_progress_cas() {
        let (store, uid) = store_with_user(dec!(5.00)).await;
        let order = store
            .insert_order_with_debit(new_order(uid, dec!(1.00)))
            .await
            .unwrap();
        let progress = OrderProgress {
            status: OrderStatus::InProgress,
            start_count: Some(10),
            current_count: 5,
            remains: Some(995),
            upstream_status: Some("In progress".to_string()),
            completion_date: None,
        };

        let updated = store
            .apply_progress(order.id, order.version, progress.clone())
            .await
            .unwrap();
        assert_eq!(updated.version, order.version + 1);

        let err = store
            .apply_progress(order.id, order.version, progress)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_attach_upstream_only_once() {
        let (store, uid) = store_with_user(dec!(5.00)).await;
        let order = store
            .insert_order_with_debit(new_order(uid, dec!(1.00)))
            .await
            .unwrap();
        let attached = store.attach_upstream(order.id, 777).await.unwrap();
        assert_eq!(attached.status, OrderStatus::InProgress);
        assert!(store.attach_upstream(order.id, 778).await.is_err());

        let found = store.find_by_upstream_id("followiz", 777).await.unwrap();
        assert_eq!(found.map(|o| o.id), Some(order.id));
        assert!(store.find_by_upstream_id("turktakipcim", 777).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upstream_id_linked_to_one_order_per_provider() {
        let (store, uid) = store_with_user(dec!(5.00)).await;
        let a = store
            .insert_order_with_debit(new_order(uid, dec!(1.00)))
            .await
            .unwrap();
        let b = store
            .insert_order_with_debit(new_order(uid, dec!(1.00)))
            .await
            .unwrap();
        store.attach_upstream(a.id, 900).await.unwrap();

        let err = store.attach_upstream(b.id, 900).await.unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
        assert_eq!(store.get_order(b.id).await.unwrap().status, OrderStatus::Pending);

        store.attach_upstream(b.id, 901).await.unwrap();
        let found = store.find_by_upstream_id("followiz", 901).await.unwrap();
        assert_eq!(found.map(|o| o.id), Some(b.id));
        let found = store.find_by_upstream_id("followiz", 900).await.unwrap();
        assert_eq!(found.map(|o| o.id), Some(a.id));
    }

    #[tokio::test]
    async fn test_admin_update_requires_current_version() {
        let (store, uid) = store_with_user(dec!(5.00)).await;
        let order = store
            .insert_order_with_debit(new_order(uid, dec!(1.00)))
            .await
            .unwrap();
        store.cancel_with_refund(order.id).await.unwrap();

        // A write based on the pre-cancel read must not reopen the order
        let err = store
            .admin_update(order.id, order.version, Some(OrderStatus::InProgress), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
        let current = store.get_order(order.id).await.unwrap();
        assert_eq!(current.status, OrderStatus::Cancelled);

        let noted = store
            .admin_update(order.id, current.version, None, Some("ok".to_string()))
            .await
            .unwrap();
        assert_eq!(noted.notes.as_deref(), Some("ok"));
        assert!(matches!(
            store.admin_update(999, 0, None, None).await,
            Err(ShopError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_user_with_orders_conflicts() {
        let (store, uid) = store_with_user(dec!(5.00)).await;
        store
            .insert_order_with_debit(new_order(uid, dec!(1.00)))
            .await
            .unwrap();
        let err = store.delete_user(uid).await.unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
    }
}
