//! End-to-end engine flow through scripted venues

use chrono::Utc;
use meridian_connector::report::{ExecutionKind, ExecutionReport};
use meridian_connector::testing::ScriptedVenue;
use meridian_connector::VenueConfig;
use meridian_core::{EngineEvent, OrderRequest, OrderStatus, Side};
use meridian_risk_validator::{RiskLimit, RiskLimitKind, RiskLimitSet};
use meridian_runner::{EngineBootstrap, EngineHandle};
use meridian_smart_router::VenueAnalytics;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn analytics(venue: &str) -> VenueAnalytics {
    VenueAnalytics::new(venue)
        .with_liquidity(dec!(1_000_000), Decimal::ZERO)
        .with_quality(dec!(0.9), dec!(0.95))
        .with_costs(dec!(2), dec!(1))
        .with_latency(dec!(5))
}

async fn start_engine(venue: Arc<ScriptedVenue>, limits: RiskLimitSet) -> EngineHandle {
    EngineBootstrap::new()
        .with_limits(limits)
        .add_venue(VenueConfig::new("nyse"), venue, analytics("nyse"))
        .build()
        .await
}

/// Wait until an event satisfies the predicate, failing after two seconds
async fn wait_for<F>(events: &mut broadcast::Receiver<EngineEvent>, mut pred: F) -> EngineEvent
where
    F: FnMut(&EngineEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.expect("event stream closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn trade_report(venue_order_id: &str, execution_id: &str, quantity: Decimal) -> ExecutionReport {
    ExecutionReport {
        venue: "nyse".into(),
        venue_order_id: venue_order_id.to_string(),
        execution_id: execution_id.to_string(),
        kind: ExecutionKind::Trade,
        symbol: "AAPL".to_string(),
        side: Side::Buy,
        price: dec!(150),
        quantity,
        commission: dec!(0.5),
        fees: dec!(0.1),
        reason: None,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn order_flows_from_creation_to_filled() {
    let _ = env_logger::try_init();
    let venue = Arc::new(ScriptedVenue::accepting());
    let handle = start_engine(Arc::clone(&venue), RiskLimitSet::with_defaults()).await;
    let mut events = handle.subscribe();

    let request = OrderRequest::limit("AAPL", Side::Buy, dec!(100), dec!(150), "acct-1");
    let order = handle.engine.create_order(request).await.unwrap();

    wait_for(&mut events, |e| {
        matches!(e, EngineEvent::OrderStatusChanged { status: OrderStatus::Submitted, .. })
    })
    .await;

    let submitted = handle.engine.get_order(&order.id).unwrap();
    let venue_order_id = submitted.venue_executions[0]
        .venue_order_id
        .clone()
        .expect("accepted execution has a venue order id");

    // Two partial executions, the second completing the order
    handle
        .connector
        .process_execution_report(trade_report(&venue_order_id, "E-1", dec!(60)))
        .await
        .unwrap();
    wait_for(&mut events, |e| {
        matches!(e, EngineEvent::OrderStatusChanged { status: OrderStatus::PartiallyFilled, .. })
    })
    .await;

    // A replayed report must not change totals
    handle
        .connector
        .process_execution_report(trade_report(&venue_order_id, "E-1", dec!(60)))
        .await
        .unwrap();

    handle
        .connector
        .process_execution_report(trade_report(&venue_order_id, "E-2", dec!(40)))
        .await
        .unwrap();
    wait_for(&mut events, |e| matches!(e, EngineEvent::OrderComplete { .. })).await;

    let filled = handle.engine.get_order(&order.id).unwrap();
    assert_eq!(filled.status, OrderStatus::Filled);
    assert_eq!(filled.executed_quantity, dec!(100));
    assert_eq!(filled.remaining_quantity, Decimal::ZERO);
    assert_eq!(filled.avg_fill_price, Some(dec!(150)));
    assert_eq!(
        filled.executed_quantity + filled.remaining_quantity,
        filled.original_quantity
    );
}

#[tokio::test]
async fn active_order_can_be_canceled() {
    let _ = env_logger::try_init();
    let venue = Arc::new(ScriptedVenue::accepting());
    let handle = start_engine(Arc::clone(&venue), RiskLimitSet::with_defaults()).await;
    let mut events = handle.subscribe();

    let request = OrderRequest::limit("AAPL", Side::Buy, dec!(100), dec!(150), "acct-1");
    let order = handle.engine.create_order(request).await.unwrap();

    wait_for(&mut events, |e| {
        matches!(e, EngineEvent::OrderStatusChanged { status: OrderStatus::Submitted, .. })
    })
    .await;

    let canceled = handle.engine.cancel_order(order.id, "test cancel").await.unwrap();
    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert_eq!(venue.canceled.lock().unwrap().len(), 1);

    // Terminal; a second cancel is illegal
    let err = handle.engine.cancel_order(order.id, "again").await.unwrap_err();
    assert!(matches!(
        err,
        meridian_order_manager::EngineError::InvalidState { .. }
    ));
}

#[tokio::test]
async fn risk_breach_rejects_before_any_venue_sees_the_order() {
    let _ = env_logger::try_init();
    let limits = RiskLimitSet::with_defaults();
    limits.upsert(RiskLimit::new(
        "position_size",
        RiskLimitKind::PositionSize,
        dec!(10),
        dec!(5),
    ));

    let venue = Arc::new(ScriptedVenue::accepting());
    let handle = start_engine(Arc::clone(&venue), limits).await;
    let mut events = handle.subscribe();

    let request = OrderRequest::limit("AAPL", Side::Buy, dec!(100), dec!(150), "acct-1");
    let order = handle.engine.create_order(request).await.unwrap();

    wait_for(&mut events, |e| matches!(e, EngineEvent::RiskBreach { .. })).await;
    wait_for(&mut events, |e| {
        matches!(e, EngineEvent::OrderStatusChanged { status: OrderStatus::Rejected, .. })
    })
    .await;

    let rejected = handle.engine.get_order(&order.id).unwrap();
    assert_eq!(rejected.status, OrderStatus::Rejected);
    assert!(rejected.risk_checks.iter().any(|c| c.is_failed()));
    assert!(venue.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn venue_rejection_of_all_allocations_fails_the_order() {
    let _ = env_logger::try_init();
    let venue = Arc::new(ScriptedVenue::accepting());
    venue.push_outcome(meridian_connector::testing::ScriptedOutcome::Reject(
        "no capacity".to_string(),
    ));

    let handle = start_engine(Arc::clone(&venue), RiskLimitSet::with_defaults()).await;
    let mut events = handle.subscribe();

    let request = OrderRequest::limit("AAPL", Side::Buy, dec!(100), dec!(150), "acct-1");
    let order = handle.engine.create_order(request).await.unwrap();

    wait_for(&mut events, |e| {
        matches!(e, EngineEvent::OrderStatusChanged { status: OrderStatus::Failed, .. })
    })
    .await;

    let failed = handle.engine.get_order(&order.id).unwrap();
    assert_eq!(failed.status, OrderStatus::Failed);
    assert!(failed.venue_executions.iter().all(|e| {
        e.status == meridian_core::VenueExecutionStatus::Rejected
    }));
}
