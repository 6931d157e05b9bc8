//! Engine event stream
//!
//! Every user-visible outcome surfaces as an event. Producers publish on a
//! `tokio::sync::broadcast` channel owned by the order manager; any number of
//! listeners may subscribe, and a slow listener never blocks the engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{OrderFill, OrderId, OrderStatus, RiskCheck};
use crate::routing::VenueId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationSeverity {
    Info,
    Warning,
    Error,
}

/// Rolling observability snapshot published by the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub orders_per_second: Decimal,
    pub fills_per_second: Decimal,
    /// Share of terminal orders that completed
    pub fill_rate: Decimal,
    pub rejection_rate: Decimal,
    pub avg_submit_latency_ms: Decimal,
    pub avg_slippage: Decimal,
}

/// Events emitted by the engine for external collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    OrderCreated {
        order_id: OrderId,
        symbol: String,
        account: String,
    },
    OrderStatusChanged {
        order_id: OrderId,
        previous: OrderStatus,
        status: OrderStatus,
    },
    OrderError {
        order_id: OrderId,
        reason: String,
    },
    Fill {
        fill: OrderFill,
    },
    OrderComplete {
        order_id: OrderId,
        avg_fill_price: Option<Decimal>,
        slippage: Option<Decimal>,
        time_to_fill_ms: i64,
    },
    RiskBreach {
        order_id: OrderId,
        account: String,
        checks: Vec<RiskCheck>,
    },
    PartialFillTimeout {
        order_id: OrderId,
        filled_quantity: Decimal,
        remaining_quantity: Decimal,
    },
    Notification {
        severity: NotificationSeverity,
        message: String,
    },
    PerformanceMetrics {
        report: PerformanceReport,
        at: DateTime<Utc>,
    },
    ConnectionEstablished {
        venue: VenueId,
    },
    ConnectionLost {
        venue: VenueId,
        reason: String,
    },
    ConnectionFailed {
        venue: VenueId,
        reason: String,
    },
}
