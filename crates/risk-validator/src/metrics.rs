//! Per-account rolling risk metrics

use chrono::{DateTime, Utc};
use meridian_core::{OrderFill, Side};
use rust_decimal::Decimal;
use rust_decimal::prelude::Signed;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Position in one symbol, tracked for exposure and realized P&L
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolPosition {
    /// Signed quantity (positive = long)
    pub quantity: Decimal,
    /// Weighted average entry price
    pub avg_price: Decimal,
    pub realized_pnl: Decimal,
}

impl SymbolPosition {
    /// Apply a fill, returning the realized P&L from this fill
    fn apply_fill(&mut self, side: Side, quantity: Decimal, price: Decimal) -> Decimal {
        let signed_qty = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };

        let mut realized = Decimal::ZERO;

        // Realize P&L when reducing an existing position
        if (self.quantity > Decimal::ZERO && signed_qty < Decimal::ZERO)
            || (self.quantity < Decimal::ZERO && signed_qty > Decimal::ZERO)
        {
            let close_qty = signed_qty.abs().min(self.quantity.abs());
            realized = if self.quantity > Decimal::ZERO {
                close_qty * (price - self.avg_price)
            } else {
                close_qty * (self.avg_price - price)
            };
        }

        let new_quantity = self.quantity + signed_qty;

        if new_quantity.is_zero() {
            self.avg_price = Decimal::ZERO;
        } else if (self.quantity >= Decimal::ZERO && signed_qty > Decimal::ZERO)
            || (self.quantity <= Decimal::ZERO && signed_qty < Decimal::ZERO)
        {
            // Adding to position - weighted average
            let total_cost = self.quantity.abs() * self.avg_price + quantity * price;
            self.avg_price = total_cost / new_quantity.abs();
        } else if new_quantity.signum() != self.quantity.signum() {
            // Flipped sides - fill price becomes the new basis
            self.avg_price = price;
        }

        self.quantity = new_quantity;
        self.realized_pnl += realized;
        realized
    }

    pub fn notional(&self, mark_price: Decimal) -> Decimal {
        self.quantity.abs() * mark_price
    }
}

/// Rolling risk state for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRiskMetrics {
    pub account: String,
    /// Account equity, used as the leverage denominator
    pub equity: Decimal,
    pub positions: HashMap<String, SymbolPosition>,
    pub daily_pnl: Decimal,
    pub weekly_pnl: Decimal,
    pub monthly_pnl: Decimal,
    pub total_commission: Decimal,
    /// Timestamps of recent order submissions, for rate checks
    pub order_times: VecDeque<DateTime<Utc>>,
}

impl AccountRiskMetrics {
    pub fn new(account: impl Into<String>, equity: Decimal) -> Self {
        Self {
            account: account.into(),
            equity,
            positions: HashMap::new(),
            daily_pnl: Decimal::ZERO,
            weekly_pnl: Decimal::ZERO,
            monthly_pnl: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            order_times: VecDeque::new(),
        }
    }

    /// Update metrics from a fill. Must be called exactly once per fill.
    pub fn apply_fill(&mut self, fill: &OrderFill) {
        let position = self.positions.entry(fill.symbol.clone()).or_default();
        let realized = position.apply_fill(fill.side, fill.quantity, fill.price);

        let cost = fill.commission + fill.fees;
        self.total_commission += cost;
        self.daily_pnl += realized - cost;
        self.weekly_pnl += realized - cost;
        self.monthly_pnl += realized - cost;
    }

    /// Record an order submission time for the rate window
    pub fn record_order(&mut self, at: DateTime<Utc>) {
        self.order_times.push_back(at);
        // Keep a day of history at most; rate windows are much shorter
        while self.order_times.len() > 10_000 {
            self.order_times.pop_front();
        }
    }

    /// Orders submitted within the trailing window ending at `now`
    pub fn orders_in_window(&self, window: chrono::Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - window;
        self.order_times.iter().filter(|t| **t > cutoff).count()
    }

    /// Signed position quantity for a symbol
    pub fn position_quantity(&self, symbol: &str) -> Decimal {
        self.positions
            .get(symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Gross exposure across all symbols at the given mark prices
    pub fn gross_exposure(&self, mark_prices: &HashMap<String, Decimal>) -> Decimal {
        self.positions
            .iter()
            .map(|(symbol, position)| {
                let mark = mark_prices
                    .get(symbol)
                    .copied()
                    .unwrap_or(position.avg_price);
                position.notional(mark)
            })
            .sum()
    }

    /// Exposure / equity
    pub fn leverage(&self, mark_prices: &HashMap<String, Decimal>) -> Decimal {
        if self.equity.is_zero() {
            return Decimal::ZERO;
        }
        self.gross_exposure(mark_prices) / self.equity
    }

    /// Start-of-day reset
    pub fn reset_daily(&mut self) {
        self.daily_pnl = Decimal::ZERO;
    }
}
