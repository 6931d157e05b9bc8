use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderStatus, OrderType, RiskCheck, Side, TimeInForce};
use crate::requests::OrderRequest;
use crate::routing::VenueId;

/// Unique identifier for an order
pub type OrderId = Uuid;

/// Per-venue execution record for one allocation of an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueExecution {
    pub venue: VenueId,
    /// Venue-assigned order id, once accepted
    pub venue_order_id: Option<String>,
    pub allocated_quantity: Decimal,
    pub status: VenueExecutionStatus,
    pub reject_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VenueExecutionStatus {
    Pending,
    Accepted,
    Rejected,
    Canceled,
}

/// Snapshot of the mutable order fields, taken before and after a modification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationSnapshot {
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
}

/// Audit record of one `modify_order` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modification {
    pub modified_at: DateTime<Utc>,
    pub reason: String,
    pub previous: ModificationSnapshot,
    pub updated: ModificationSnapshot,
    /// Per-venue propagation outcome (venue, accepted)
    pub venue_results: Vec<(VenueId, bool)>,
}

/// Full order details
///
/// Owned exclusively by the order manager; mutated only through lifecycle
/// transitions and immutable once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Caller-supplied correlation id
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Quantity originally requested
    pub original_quantity: Decimal,
    pub executed_quantity: Decimal,
    pub remaining_quantity: Decimal,
    /// Required for Limit and StopLimit orders
    pub price: Option<Decimal>,
    /// Required for StopLoss and StopLimit orders
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub account: String,
    pub strategy: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub total_commission: Decimal,
    pub total_fees: Decimal,
    /// Volume-weighted average fill price
    pub avg_fill_price: Option<Decimal>,
    /// One record per venue allocation
    pub venue_executions: Vec<VenueExecution>,
    /// Risk check audit trail
    pub risk_checks: Vec<RiskCheck>,
    pub modifications: Vec<Modification>,
}

impl Order {
    /// Create a new order from a request, with an explicit creation time
    pub fn from_request(request: &OrderRequest, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            original_quantity: request.quantity,
            executed_quantity: Decimal::ZERO,
            remaining_quantity: request.quantity,
            price: request.price,
            stop_price: request.stop_price,
            time_in_force: request.time_in_force,
            account: request.account.clone(),
            strategy: request.strategy.clone(),
            status: OrderStatus::PendingValidation,
            created_at: timestamp,
            submitted_at: None,
            updated_at: timestamp,
            total_commission: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            avg_fill_price: None,
            venue_executions: Vec::new(),
            risk_checks: Vec::new(),
            modifications: Vec::new(),
        }
    }

    /// Notional value of the remaining quantity at the limit (or given) price
    pub fn notional(&self, reference_price: Option<Decimal>) -> Option<Decimal> {
        self.price
            .or(reference_price)
            .map(|p| p * self.original_quantity)
    }

    /// Apply an execution of `quantity` at `price`
    ///
    /// Maintains `executed + remaining == original` and the incremental VWAP.
    pub fn apply_fill(
        &mut self,
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
        fees: Decimal,
        timestamp: DateTime<Utc>,
    ) {
        let prior_executed = self.executed_quantity;
        self.executed_quantity += quantity;
        self.remaining_quantity = self.original_quantity - self.executed_quantity;
        self.total_commission += commission;
        self.total_fees += fees;
        self.updated_at = timestamp;

        self.avg_fill_price = Some(match self.avg_fill_price {
            Some(avg) if !self.executed_quantity.is_zero() => {
                (avg * prior_executed + price * quantity) / self.executed_quantity
            }
            _ => price,
        });
    }

    /// Returns true if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.executed_quantity >= self.original_quantity
    }

    /// Slippage of realized average price vs an expected price, signed so
    /// that positive means worse than expected
    pub fn slippage(&self, expected_price: Decimal) -> Option<Decimal> {
        self.avg_fill_price.map(|avg| match self.side {
            Side::Buy => avg - expected_price,
            Side::Sell => expected_price - avg,
        })
    }
}
