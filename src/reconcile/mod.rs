//! Reconciliation Engine
//!
//! Aligns local orders with what the upstream provider reports, from two
//! drivers: pull (`sync_order`, `sync_active`) and push (webhooks).
//!
//! # Status mapping
//!
//! | provider status                   | local status  | current_count      |
//! |-----------------------------------|---------------|--------------------|
//! | Completed                         | completed     | progress           |
//! | In progress, Partial, Processing  | in_progress   | progress           |
//! | Pending                           | in_progress   | unchanged          |
//! | Canceled                          | cancelled     | unchanged          |
//! | anything else                     | no mutation   | no mutation        |
//!
//! Progress is `quantity - remains` clamped to `[0, quantity]`.
//!
//! A report is identified by `(upstream id, status, remains)`; a report
//! without `remains` keeps the recorded value. Re-applying the last applied
//! report, or any report to a terminal order, is a no-op.

pub mod engine;
pub mod webhook;

use chrono::{DateTime, Utc};

use crate::store::{Order, OrderProgress, OrderStatus};
use crate::upstream::{OrderStatusReport, ProviderStatus};

pub use engine::{ReconciliationEngine, SyncSummary};
pub use webhook::{SIGNATURE_HEADER, WebhookPayload, sign_payload, verify_signature};

/// What a provider status does to `current_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountRule {
    Progress,
    Unchanged,
}

/// Local status and count rule for a provider status; `None` for unknown
pub fn map_status(status: &ProviderStatus) -> Option<(OrderStatus, CountRule)> {
    match status {
        ProviderStatus::Completed => Some((OrderStatus::Completed, CountRule::Progress)),
        ProviderStatus::InProgress | ProviderStatus::Partial | ProviderStatus::Processing => {
            Some((OrderStatus::InProgress, CountRule::Progress))
        }
        ProviderStatus::Pending => Some((OrderStatus::InProgress, CountRule::Unchanged)),
        ProviderStatus::Canceled => Some((OrderStatus::Cancelled, CountRule::Unchanged)),
        ProviderStatus::Other(_) => None,
    }
}

/// Delivered units: `quantity - remains`, clamped to `[0, quantity]`
pub fn canonical_progress(quantity: i64, remains: i64) -> i64 {
    quantity.saturating_sub(remains).clamp(0, quantity.max(0))
}

/// Result of applying one report
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Updated(Order),
    Unchanged(Order),
}

impl Outcome {
    pub fn order(&self) -> &Order {
        match self {
            Outcome::Updated(o) | Outcome::Unchanged(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            Outcome::Updated(o) | Outcome::Unchanged(o) => o,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Outcome::Updated(_))
    }
}

/// Fields to write for `report`, or `None` when nothing should change
pub fn plan_update(
    order: &Order,
    report: &OrderStatusReport,
    now: DateTime<Utc>,
) -> Option<OrderProgress> {
    if order.status.is_terminal() {
        return None;
    }
    let remains = report.remains.or(order.remains);
    if order.upstream_status.as_deref() == Some(report.status.as_str()) && order.remains == remains
    {
        return None;
    }
    let (status, rule) = map_status(&report.status)?;

    let current_count = match (rule, report.remains) {
        (CountRule::Progress, Some(remains)) => canonical_progress(order.quantity, remains),
        (CountRule::Progress, None) if status == OrderStatus::Completed => order.quantity,
        _ => order.current_count,
    };

    let completion_date = if status == OrderStatus::Completed {
        order.completion_date.or(Some(now))
    } else {
        order.completion_date
    };

    let progress = OrderProgress {
        status,
        start_count: report.start_count.or(order.start_count),
        current_count,
        remains,
        upstream_status: Some(report.status.as_str().to_string()),
        completion_date,
    };
    (progress != OrderProgress::from(order)).then_some(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn order(status: OrderStatus, quantity: i64) -> Order {
        let now = Utc::now();
        Order {
            id: 1,
            user_id: 1,
            provider: "followiz".to_string(),
            service_id: 1,
            link: "https://instagram.com/x".to_string(),
            quantity,
            total_price: Decimal::ONE,
            status,
            upstream_order_id: Some(500),
            start_count: None,
            current_count: 0,
            remains: None,
            upstream_status: None,
            refunded_amount: Decimal::ZERO,
            completion_date: None,
            notes: None,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn report(status: &str, remains: Option<i64>, start_count: Option<i64>) -> OrderStatusReport {
        OrderStatusReport {
            status: ProviderStatus::from(status),
            remains,
            start_count,
            charge: None,
            currency: None,
        }
    }

    #[test]
    fn test_canonical_progress() {
        assert_eq!(canonical_progress(1000, 250), 750);
        assert_eq!(canonical_progress(1000, 0), 1000);
        assert_eq!(canonical_progress(1000, 1500), 0);
        assert_eq!(canonical_progress(1000, -20), 1000);
    }

    #[test]
    fn test_completed_uses_quantity_minus_remains() {
        // start_count + (start_count - remains) would give 200 here
        let o = order(OrderStatus::InProgress, 100);
        let p = plan_update(&o, &report("Completed", Some(0), Some(100)), Utc::now()).unwrap();
        assert_eq!(p.status, OrderStatus::Completed);
        assert_eq!(p.current_count, 100);
        assert_eq!(p.start_count, Some(100));
        assert!(p.completion_date.is_some());
    }

    #[test]
    fn test_in_progress_variants() {
        let o = order(OrderStatus::InProgress, 1000);
        for status in ["In progress", "Partial", "Processing"] {
            let p = plan_update(&o, &report(status, Some(400), Some(10)), Utc::now()).unwrap();
            assert_eq!(p.status, OrderStatus::InProgress);
            assert_eq!(p.current_count, 600);
            assert!(p.completion_date.is_none());
        }
    }

    #[test]
    fn test_pending_keeps_count() {
        let mut o = order(OrderStatus::InProgress, 1000);
        o.current_count = 42;
        let p = plan_update(&o, &report("Pending", Some(1000), None), Utc::now()).unwrap();
        assert_eq!(p.status, OrderStatus::InProgress);
        assert_eq!(p.current_count, 42);
    }

    #[test]
    fn test_canceled_keeps_count() {
        let mut o = order(OrderStatus::InProgress, 1000);
        o.current_count = 300;
        let p = plan_update(&o, &report("Canceled", Some(700), None), Utc::now()).unwrap();
        assert_eq!(p.status, OrderStatus::Cancelled);
        assert_eq!(p.current_count, 300);
    }

    #[test]
    fn test_completed_without_remains() {
        let o = order(OrderStatus::InProgress, 250);
        let p = plan_update(&o, &report("Completed", None, None), Utc::now()).unwrap();
        assert_eq!(p.current_count, 250);
    }

    #[test]
    fn test_unknown_status_ignored() {
        let o = order(OrderStatus::InProgress, 100);
        assert!(plan_update(&o, &report("Refunded", Some(0), None), Utc::now()).is_none());
    }

    #[test]
    fn test_terminal_absorbs() {
        for st in [
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            let o = order(st, 100);
            assert!(plan_update(&o, &report("In progress", Some(50), None), Utc::now()).is_none());
        }
    }

    #[test]
    fn test_same_report_is_noop() {
        let mut o = order(OrderStatus::InProgress, 100);
        o.upstream_status = Some("In progress".to_string());
        o.remains = Some(40);
        assert!(plan_update(&o, &report("In progress", Some(40), None), Utc::now()).is_none());
        assert!(plan_update(&o, &report("In progress", Some(30), None), Utc::now()).is_some());
    }

    #[test]
    fn test_report_without_remains_matches_recorded() {
        let mut o = order(OrderStatus::InProgress, 100);
        o.upstream_status = Some("In progress".to_string());
        o.remains = Some(40);
        o.current_count = 60;
        assert!(plan_update(&o, &report("In progress", None, None), Utc::now()).is_none());
    }

    #[test]
    fn test_completion_date_preserved() {
        let mut o = order(OrderStatus::InProgress, 100);
        let earlier = Utc::now() - chrono::Duration::hours(1);
        o.completion_date = Some(earlier);
        let p = plan_update(&o, &report("Completed", Some(0), None), Utc::now()).unwrap();
        assert_eq!(p.completion_date, Some(earlier));
    }
}
