//! End-to-end order flows over the in-memory store and a scripted gateway

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use super::*;
use crate::catalog::Catalog;
use crate::error::ShopError;
use crate::pricing::PricingCalculator;
use crate::reconcile::ReconciliationEngine;
use crate::store::{MemoryStore, NewUser, OrderStatus, PageRequest, Role, UserStore};
use crate::upstream::{MockGateway, ProviderRegistry, UpstreamError};

struct Fixture {
    store: Arc<MemoryStore>,
    gateway: Arc<MockGateway>,
    orders: OrderService,
    reconcile: ReconciliationEngine,
    alice: i64,
    bob: i64,
}

async fn user(store: &MemoryStore, name: &str, balance: Decimal) -> i64 {
    let user = store
        .create_user(NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "hash".to_string(),
            role: Role::User,
        })
        .await
        .unwrap();
    if !balance.is_zero() {
        store.credit(user.id, balance).await.unwrap();
    }
    user.id
}

async fn fixture(alice_balance: Decimal) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(
        MockGateway::new("followiz")
            .with_service(1, dec!(0.90), 10, 10_000)
            .with_service(2, dec!(2.00), 100, 500),
    );
    let mut providers = ProviderRegistry::new();
    providers.register(gateway.clone());

    let catalog = Catalog::new(providers.clone(), PricingCalculator::default());
    let reconcile = ReconciliationEngine::new(store.clone(), providers.clone());
    let orders = OrderService::new(store.clone(), catalog, providers, reconcile.clone());

    let alice = user(&store, "alice", alice_balance).await;
    let bob = user(&store, "bob", dec!(10)).await;
    Fixture {
        store,
        gateway,
        orders,
        reconcile,
        alice,
        bob,
    }
}

fn request(service_id: i64, quantity: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        service_id,
        link: "https://instagram.com/alice".to_string(),
        quantity,
        runs: None,
        interval: None,
    }
}

async fn balance(f: &Fixture, user_id: i64) -> Decimal {
    f.store.get_user(user_id).await.unwrap().balance
}

#[tokio::test]
async fn test_create_order_debits_and_submits() {
    let f = fixture(dec!(5.00)).await;
    let order = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap();

    assert_eq!(order.status, OrderStatus::InProgress);
    assert_eq!(order.upstream_order_id, Some(1000));
    assert_eq!(order.total_price, dec!(1.368));
    assert_eq!(order.provider, "followiz");
    assert_eq!(balance(&f, f.alice).await, dec!(3.632));

    let sent = f.gateway.last_created().unwrap();
    assert_eq!(sent.service, 1);
    assert_eq!(sent.quantity, 1000);
}

#[tokio::test]
async fn test_create_order_passes_drip_feed() {
    let f = fixture(dec!(5.00)).await;
    let mut req = request(1, 100);
    req.runs = Some(5);
    req.interval = Some(30);
    f.orders.create_order(f.alice, req).await.unwrap();

    let sent = f.gateway.last_created().unwrap();
    assert_eq!(sent.runs, Some(5));
    assert_eq!(sent.interval, Some(30));
}

#[tokio::test]
async fn test_insufficient_funds_writes_nothing() {
    let f = fixture(dec!(1.00)).await;
    let err = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap_err();

    assert!(matches!(err, ShopError::InsufficientFunds));
    assert_eq!(balance(&f, f.alice).await, dec!(1.00));
    assert_eq!(f.gateway.create_count(), 0);
    let (orders, total) = f
        .orders
        .list_orders(f.alice, PageRequest::default())
        .await
        .unwrap();
    assert!(orders.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_unknown_service_and_bounds() {
    let f = fixture(dec!(5.00)).await;

    let err = f.orders.create_order(f.alice, request(99, 1000)).await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound(_)));

    let err = f.orders.create_order(f.alice, request(2, 50)).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(ref m) if m.contains("minimum of 100")));

    let err = f.orders.create_order(f.alice, request(2, 501)).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(ref m) if m.contains("maximum of 500")));

    let mut blank = request(1, 100);
    blank.link = "   ".to_string();
    let err = f.orders.create_order(f.alice, blank).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    assert_eq!(balance(&f, f.alice).await, dec!(5.00));
    assert_eq!(f.gateway.create_count(), 0);
}

#[tokio::test]
async fn test_upstream_failure_leaves_pending_then_resubmit() {
    let f = fixture(dec!(5.00)).await;
    f.gateway
        .set_fail_create(Some(UpstreamError::Provider("Not enough funds on balance".to_string())));

    let order = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.upstream_order_id, None);
    assert!(order.notes.as_deref().unwrap().contains("Not enough funds"));
    assert_eq!(balance(&f, f.alice).await, dec!(3.632));

    let err = f.orders.resubmit_order(order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::Upstream(_)));

    f.gateway.set_fail_create(None);
    let order = f.orders.resubmit_order(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::InProgress);
    assert!(order.upstream_order_id.is_some());

    let err = f.orders.resubmit_order(order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn test_link_failure_cancels_upstream() {
    let f = fixture(dec!(5.00)).await;
    let first = f.orders.create_order(f.alice, request(1, 100)).await.unwrap();
    let taken = first.upstream_order_id.unwrap();

    f.gateway.set_next_order_id(taken);
    let second = f.orders.create_order(f.alice, request(1, 100)).await.unwrap();

    assert_eq!(second.status, OrderStatus::Pending);
    assert_eq!(second.upstream_order_id, None);
    assert!(second.notes.as_deref().unwrap().contains("could not be linked"));
    assert_eq!(f.gateway.cancelled_ids(), vec![taken]);

    // Reserved funds come back through a normal cancel
    let before = balance(&f, f.alice).await;
    f.orders.cancel_order(f.alice, second.id).await.unwrap();
    assert_eq!(balance(&f, f.alice).await, before + second.total_price);
}

#[tokio::test]
async fn test_notes_failure_still_returns_pending_order() {
    let f = fixture(dec!(5.00)).await;
    f.gateway
        .set_fail_create(Some(UpstreamError::Transport("timeout".to_string())));
    f.store.set_fail_notes(true).await;

    let order = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.notes, None);
    assert_eq!(balance(&f, f.alice).await, dec!(3.632));

    f.store.set_fail_notes(false).await;
    f.gateway.set_fail_create(None);
    let order = f.orders.resubmit_order(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::InProgress);
}

#[tokio::test]
async fn test_cancel_refunds_exactly_once() {
    let f = fixture(dec!(5.00)).await;
    let order = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap();

    let cancelled = f.orders.cancel_order(f.alice, order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.refunded_amount, dec!(1.368));
    assert_eq!(balance(&f, f.alice).await, dec!(5.00));
    assert_eq!(f.gateway.cancelled_ids(), vec![1000]);

    let err = f.orders.cancel_order(f.alice, order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
    assert_eq!(balance(&f, f.alice).await, dec!(5.00));
}

#[tokio::test]
async fn test_cancel_pending_skips_upstream() {
    let f = fixture(dec!(5.00)).await;
    f.gateway
        .set_fail_create(Some(UpstreamError::Transport("request timed out".to_string())));
    let order = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap();

    f.orders.cancel_order(f.alice, order.id).await.unwrap();
    assert_eq!(f.gateway.cancel_count(), 0);
    assert_eq!(balance(&f, f.alice).await, dec!(5.00));
}

#[tokio::test]
async fn test_cancel_completed_rejected() {
    let f = fixture(dec!(5.00)).await;
    let order = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap();
    f.gateway.set_status(1000, "Completed", 0, 10);
    let synced = f.orders.sync_order(f.alice, order.id).await.unwrap();
    assert_eq!(synced.status, OrderStatus::Completed);
    assert_eq!(synced.current_count, 1000);

    let err = f.orders.cancel_order(f.alice, order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
    assert_eq!(balance(&f, f.alice).await, dec!(3.632));
    assert_eq!(f.gateway.cancel_count(), 0);
}

#[tokio::test]
async fn test_other_users_order_forbidden() {
    let f = fixture(dec!(5.00)).await;
    let order = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap();

    assert!(matches!(
        f.orders.get_order(f.bob, order.id).await,
        Err(ShopError::Forbidden(_))
    ));
    assert!(matches!(
        f.orders.cancel_order(f.bob, order.id).await,
        Err(ShopError::Forbidden(_))
    ));
    assert!(matches!(
        f.orders.sync_order(f.bob, order.id).await,
        Err(ShopError::Forbidden(_))
    ));
    assert!(matches!(
        f.orders.get_order(f.alice, 9999).await,
        Err(ShopError::NotFound(_))
    ));
    assert_eq!(f.orders.get_order(f.alice, order.id).await.unwrap().id, order.id);
}

#[tokio::test]
async fn test_provider_cancel_then_admin_refund() {
    let f = fixture(dec!(5.00)).await;
    let order = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap();
    f.gateway.set_status(1000, "Canceled", 1000, 0);
    f.reconcile.sync_active(50).await.unwrap();

    let order = f.orders.get_order(f.alice, order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.refunded_amount.is_zero());
    assert_eq!(balance(&f, f.alice).await, dec!(3.632));

    let refunded = f.orders.refund_order(order.id).await.unwrap();
    assert_eq!(refunded.status, OrderStatus::Refunded);
    assert_eq!(balance(&f, f.alice).await, dec!(5.00));

    let err = f.orders.refund_order(order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
    assert_eq!(balance(&f, f.alice).await, dec!(5.00));
}

#[tokio::test]
async fn test_refund_after_user_cancel_conflicts() {
    let f = fixture(dec!(5.00)).await;
    let order = f.orders.create_order(f.alice, request(1, 1000)).await.unwrap();
    f.orders.cancel_order(f.alice, order.id).await.unwrap();

    let err = f.orders.refund_order(order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)));
    assert_eq!(balance(&f, f.alice).await, dec!(5.00));
}

#[tokio::test]
async fn test_list_orders_paginates_newest_first() {
    let f = fixture(dec!(100)).await;
    for _ in 0..5 {
        f.orders.create_order(f.alice, request(1, 100)).await.unwrap();
    }
    f.orders.create_order(f.bob, request(1, 100)).await.unwrap();

    let (page1, total) = f
        .orders
        .list_orders(f.alice, PageRequest::new(Some(1), Some(2)))
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(page1.len(), 2);
    assert!(page1[0].id > page1[1].id);
    assert!(page1.iter().all(|o| o.user_id == f.alice));

    let (page3, _) = f
        .orders
        .list_orders(f.alice, PageRequest::new(Some(3), Some(2)))
        .await
        .unwrap();
    assert_eq!(page3.len(), 1);
}
