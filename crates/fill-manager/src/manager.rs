//! Fill manager
//!
//! Single intake point for fills. Enforces fill-id uniqueness before any
//! totals change, keeps a bounded fill history, and arms a partial-fill
//! deadline per order that the engine watchdog polls.

use crate::aggregation::FillAggregation;
use crate::error::{FillError, Result};
use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use log::{debug, info};
use meridian_core::{OrderFill, OrderId, VenueId};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct FillManagerConfig {
    /// Oldest fills are evicted from history past this count
    pub max_fill_history: usize,
    /// A partially filled order with no fill for this long has timed out
    pub partial_fill_timeout: std::time::Duration,
}

impl Default for FillManagerConfig {
    fn default() -> Self {
        Self {
            max_fill_history: 100_000,
            partial_fill_timeout: std::time::Duration::from_secs(300),
        }
    }
}

/// Trailing-window fill statistics
#[derive(Debug, Clone)]
pub struct FillStats {
    pub fills: usize,
    pub total_quantity: Decimal,
    pub avg_fill_interval_ms: Option<i64>,
}

pub struct FillManager {
    config: FillManagerConfig,
    seen_ids: DashSet<String>,
    history: Mutex<VecDeque<OrderFill>>,
    aggregations: DashMap<OrderId, FillAggregation>,
    /// Partial-fill deadline per order, re-armed on each fill
    deadlines: DashMap<OrderId, DateTime<Utc>>,
}

impl FillManager {
    pub fn new(config: FillManagerConfig) -> Self {
        Self {
            config,
            seen_ids: DashSet::new(),
            history: Mutex::new(VecDeque::new()),
            aggregations: DashMap::new(),
            deadlines: DashMap::new(),
        }
    }

    /// Register an order before its fills arrive so completion can be
    /// detected and the partial-fill deadline armed.
    pub fn track_order(&self, order_id: OrderId, symbol: impl Into<String>, expected: Decimal) {
        self.aggregations
            .insert(order_id, FillAggregation::new(order_id, symbol, Some(expected)));
        self.arm_deadline(order_id, Utc::now());
    }

    /// Stop tracking on cancel or terminal failure; clears the deadline.
    pub fn untrack_order(&self, order_id: &OrderId) {
        self.deadlines.remove(order_id);
    }

    /// Apply one fill. Untracked orders and duplicate fill ids fail before
    /// any totals change.
    pub fn process_fill(&self, fill: OrderFill) -> Result<FillAggregation> {
        if fill.quantity <= Decimal::ZERO {
            return Err(FillError::InvalidFill(format!(
                "non-positive quantity {}",
                fill.quantity
            )));
        }
        if !self.aggregations.contains_key(&fill.order_id) {
            return Err(FillError::UntrackedOrder(fill.order_id));
        }
        if !self.seen_ids.insert(fill.fill_id.clone()) {
            return Err(FillError::DuplicateFill {
                fill_id: fill.fill_id,
            });
        }

        let Some(mut agg) = self.aggregations.get_mut(&fill.order_id) else {
            return Err(FillError::UntrackedOrder(fill.order_id));
        };
        agg.apply(&fill);
        let snapshot = agg.clone();
        drop(agg);

        if snapshot.complete {
            self.deadlines.remove(&fill.order_id);
            info!(
                "[FILLS] order {} complete: {} @ vwap {}",
                fill.order_id, snapshot.filled_quantity, snapshot.vwap
            );
        } else {
            self.arm_deadline(fill.order_id, fill.timestamp);
        }

        debug!(
            "[FILLS] {} applied to {}: filled {}",
            fill.fill_id, fill.order_id, snapshot.filled_quantity
        );

        let mut history = self.history.lock().unwrap();
        if history.len() >= self.config.max_fill_history {
            history.pop_front();
        }
        history.push_back(fill);

        Ok(snapshot)
    }

    pub fn aggregation(&self, order_id: &OrderId) -> Option<FillAggregation> {
        self.aggregations.get(order_id).map(|a| a.clone())
    }

    /// Orders whose partial-fill deadline expired; expired deadlines are
    /// removed so each timeout fires once.
    pub fn poll_timeouts(&self, now: DateTime<Utc>) -> Vec<OrderId> {
        let expired: Vec<OrderId> = self
            .deadlines
            .iter()
            .filter(|d| *d.value() <= now)
            .map(|d| *d.key())
            .collect();
        for order_id in &expired {
            self.deadlines.remove(order_id);
        }
        expired
    }

    pub fn fills_by_venue(&self, venue: &VenueId) -> Vec<OrderFill> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|f| &f.venue == venue)
            .cloned()
            .collect()
    }

    pub fn fills_by_symbol(&self, symbol: &str) -> Vec<OrderFill> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.symbol == symbol)
            .cloned()
            .collect()
    }

    /// Fill count, quantity, and average inter-fill gap over a trailing window
    pub fn stats(&self, window: Duration, now: DateTime<Utc>) -> FillStats {
        let cutoff = now - window;
        let history = self.history.lock().unwrap();
        let recent: Vec<&OrderFill> = history.iter().filter(|f| f.timestamp > cutoff).collect();

        let total_quantity = recent.iter().map(|f| f.quantity).sum();
        let avg_fill_interval_ms = if recent.len() >= 2 {
            let span = recent[recent.len() - 1].timestamp - recent[0].timestamp;
            Some(span.num_milliseconds() / (recent.len() as i64 - 1))
        } else {
            None
        };

        FillStats {
            fills: recent.len(),
            total_quantity,
            avg_fill_interval_ms,
        }
    }

    /// Tracked orders with no fills at all
    pub fn unfilled_orders(&self) -> Vec<OrderId> {
        self.aggregations
            .iter()
            .filter(|a| a.fill_count == 0)
            .map(|a| *a.key())
            .collect()
    }

    fn arm_deadline(&self, order_id: OrderId, from: DateTime<Utc>) {
        let timeout = Duration::from_std(self.config.partial_fill_timeout)
            .unwrap_or(Duration::seconds(300));
        self.deadlines.insert(order_id, from + timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::Side;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn make_manager() -> FillManager {
        FillManager::new(FillManagerConfig::default())
    }

    fn make_fill(order_id: OrderId, id: &str, quantity: Decimal) -> OrderFill {
        OrderFill {
            fill_id: id.to_string(),
            order_id,
            venue: "nyse".into(),
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            price: dec!(150),
            quantity,
            commission: dec!(0.5),
            fees: dec!(0.1),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn duplicate_fill_id_is_rejected_and_totals_unchanged() {
        let manager = make_manager();
        let order_id = Uuid::new_v4();
        manager.track_order(order_id, "AAPL", dec!(100));

        manager.process_fill(make_fill(order_id, "f1", dec!(40))).unwrap();
        let err = manager
            .process_fill(make_fill(order_id, "f1", dec!(40)))
            .unwrap_err();
        assert!(matches!(err, FillError::DuplicateFill { .. }));

        let agg = manager.aggregation(&order_id).unwrap();
        assert_eq!(agg.filled_quantity, dec!(40));
        assert_eq!(agg.fill_count, 1);
    }

    #[test]
    fn completion_clears_the_deadline() {
        let manager = make_manager();
        let order_id = Uuid::new_v4();
        manager.track_order(order_id, "AAPL", dec!(100));

        manager.process_fill(make_fill(order_id, "f1", dec!(100))).unwrap();

        let far_future = Utc::now() + Duration::days(1);
        assert!(manager.poll_timeouts(far_future).is_empty());
    }

    #[test]
    fn stalled_partial_fill_times_out_once() {
        let manager = FillManager::new(FillManagerConfig {
            partial_fill_timeout: std::time::Duration::from_secs(60),
            ..Default::default()
        });
        let order_id = Uuid::new_v4();
        manager.track_order(order_id, "AAPL", dec!(100));
        manager.process_fill(make_fill(order_id, "f1", dec!(10))).unwrap();

        let later = Utc::now() + Duration::seconds(120);
        assert_eq!(manager.poll_timeouts(later), vec![order_id]);
        assert!(manager.poll_timeouts(later).is_empty());
    }

    #[test]
    fn each_fill_rearms_the_deadline() {
        let manager = FillManager::new(FillManagerConfig {
            partial_fill_timeout: std::time::Duration::from_secs(60),
            ..Default::default()
        });
        let order_id = Uuid::new_v4();
        manager.track_order(order_id, "AAPL", dec!(100));

        let mut late_fill = make_fill(order_id, "f1", dec!(10));
        late_fill.timestamp = Utc::now() + Duration::seconds(90);
        manager.process_fill(late_fill).unwrap();

        // Original deadline would have expired; the fill pushed it out
        let check = Utc::now() + Duration::seconds(100);
        assert!(manager.poll_timeouts(check).is_empty());
    }

    #[test]
    fn history_is_bounded_with_oldest_eviction() {
        let manager = FillManager::new(FillManagerConfig {
            max_fill_history: 2,
            ..Default::default()
        });
        let order_id = Uuid::new_v4();
        manager.track_order(order_id, "AAPL", dec!(100));

        for i in 0..3 {
            manager
                .process_fill(make_fill(order_id, &format!("f{i}"), dec!(1)))
                .unwrap();
        }

        let fills = manager.fills_by_symbol("AAPL");
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].fill_id, "f1");
    }

    #[test]
    fn venue_and_symbol_queries_filter_history() {
        let manager = make_manager();
        let order_id = Uuid::new_v4();
        manager.track_order(order_id, "AAPL", dec!(100));
        let mut other = make_fill(order_id, "f2", dec!(5));
        other.venue = "arca".into();
        other.symbol = "MSFT".to_string();

        manager.process_fill(make_fill(order_id, "f1", dec!(5))).unwrap();
        manager.process_fill(other).unwrap();

        assert_eq!(manager.fills_by_venue(&"nyse".into()).len(), 1);
        assert_eq!(manager.fills_by_symbol("MSFT").len(), 1);
    }

    #[test]
    fn fills_for_untracked_orders_are_rejected() {
        let manager = make_manager();
        let order_id = Uuid::new_v4();

        let err = manager
            .process_fill(make_fill(order_id, "f1", dec!(5)))
            .unwrap_err();
        assert!(matches!(err, FillError::UntrackedOrder(id) if id == order_id));
        assert!(manager.fills_by_symbol("AAPL").is_empty());

        // The fill id is not consumed by the rejection
        manager.track_order(order_id, "AAPL", dec!(100));
        manager.process_fill(make_fill(order_id, "f1", dec!(5))).unwrap();
    }

    #[test]
    fn untracked_orders_with_no_fills_are_reported() {
        let manager = make_manager();
        let order_id = Uuid::new_v4();
        manager.track_order(order_id, "AAPL", dec!(100));
        assert_eq!(manager.unfilled_orders(), vec![order_id]);

        manager.process_fill(make_fill(order_id, "f1", dec!(1))).unwrap();
        assert!(manager.unfilled_orders().is_empty());
    }
}
