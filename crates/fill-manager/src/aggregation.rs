//! Per-order fill aggregation

use chrono::{DateTime, Utc};
use meridian_core::{OrderFill, OrderId, VenueId};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Running aggregate of all fills for one order
#[derive(Debug, Clone)]
pub struct FillAggregation {
    pub order_id: OrderId,
    pub symbol: String,
    /// Known when the order was registered before its first fill
    pub expected_quantity: Option<Decimal>,
    pub filled_quantity: Decimal,
    pub vwap: Decimal,
    pub total_commission: Decimal,
    pub total_fees: Decimal,
    pub venues: HashSet<VenueId>,
    pub first_fill_at: Option<DateTime<Utc>>,
    pub last_fill_at: Option<DateTime<Utc>>,
    pub fill_count: usize,
    pub complete: bool,
}

impl FillAggregation {
    pub fn new(order_id: OrderId, symbol: impl Into<String>, expected: Option<Decimal>) -> Self {
        Self {
            order_id,
            symbol: symbol.into(),
            expected_quantity: expected,
            filled_quantity: Decimal::ZERO,
            vwap: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            venues: HashSet::new(),
            first_fill_at: None,
            last_fill_at: None,
            fill_count: 0,
            complete: false,
        }
    }

    /// Fold one fill into the aggregate
    pub fn apply(&mut self, fill: &OrderFill) {
        let prior = self.filled_quantity;
        self.filled_quantity += fill.quantity;
        if self.filled_quantity > Decimal::ZERO {
            self.vwap =
                (self.vwap * prior + fill.price * fill.quantity) / self.filled_quantity;
        }
        self.total_commission += fill.commission;
        self.total_fees += fill.fees;
        self.venues.insert(fill.venue.clone());
        self.first_fill_at.get_or_insert(fill.timestamp);
        self.last_fill_at = Some(fill.timestamp);
        self.fill_count += 1;

        if let Some(expected) = self.expected_quantity {
            self.complete = self.filled_quantity >= expected;
        }
    }

    pub fn remaining_quantity(&self) -> Option<Decimal> {
        self.expected_quantity.map(|e| e - self.filled_quantity)
    }

    pub fn notional(&self) -> Decimal {
        self.vwap * self.filled_quantity
    }
}
