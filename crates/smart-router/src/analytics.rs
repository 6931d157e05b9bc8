//! Per-venue liquidity and quality analytics

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use meridian_core::VenueId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot of one venue's execution characteristics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueAnalytics {
    pub venue: VenueId,
    /// Displayed liquidity available at the top of book
    pub available_liquidity: Decimal,
    /// Estimated non-displayed liquidity (dark pools, icebergs)
    pub hidden_liquidity: Decimal,
    /// Depth within a few levels of the touch
    pub market_depth: Decimal,
    pub spread_bps: Decimal,
    /// Historical share of submitted quantity that filled (0..1)
    pub fill_rate: Decimal,
    pub avg_latency_ms: Decimal,
    /// All-in cost of execution (fees + expected spread paid)
    pub effective_cost_bps: Decimal,
    /// Uptime/correctness score (0..1)
    pub reliability: Decimal,
    pub dark_pool: bool,
    pub updated_at: DateTime<Utc>,
}

impl VenueAnalytics {
    pub fn new(venue: impl Into<VenueId>) -> Self {
        Self {
            venue: venue.into(),
            available_liquidity: Decimal::ZERO,
            hidden_liquidity: Decimal::ZERO,
            market_depth: Decimal::ZERO,
            spread_bps: Decimal::ZERO,
            fill_rate: Decimal::ONE,
            avg_latency_ms: Decimal::ZERO,
            effective_cost_bps: Decimal::ZERO,
            reliability: Decimal::ONE,
            dark_pool: false,
            updated_at: Utc::now(),
        }
    }

    pub fn with_liquidity(mut self, available: Decimal, hidden: Decimal) -> Self {
        self.available_liquidity = available;
        self.hidden_liquidity = hidden;
        self
    }

    pub fn with_quality(mut self, fill_rate: Decimal, reliability: Decimal) -> Self {
        self.fill_rate = fill_rate;
        self.reliability = reliability;
        self
    }

    pub fn with_costs(mut self, effective_cost_bps: Decimal, spread_bps: Decimal) -> Self {
        self.effective_cost_bps = effective_cost_bps;
        self.spread_bps = spread_bps;
        self
    }

    pub fn with_latency(mut self, avg_latency_ms: Decimal) -> Self {
        self.avg_latency_ms = avg_latency_ms;
        self
    }

    pub fn dark(mut self) -> Self {
        self.dark_pool = true;
        self
    }

    /// Displayed plus hidden liquidity
    pub fn total_liquidity(&self) -> Decimal {
        self.available_liquidity + self.hidden_liquidity
    }

    pub fn is_fresh(&self, max_staleness: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.updated_at <= max_staleness
    }
}

/// Concurrent table of venue analytics, keyed per venue
#[derive(Debug, Default)]
pub struct VenueAnalyticsTable {
    venues: DashMap<VenueId, VenueAnalytics>,
}

impl VenueAnalyticsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a venue's analytics
    pub fn upsert(&self, mut analytics: VenueAnalytics) {
        analytics.updated_at = Utc::now();
        self.upsert_raw(analytics);
    }

    /// Insert without refreshing the timestamp
    pub fn upsert_raw(&self, analytics: VenueAnalytics) {
        self.venues.insert(analytics.venue.clone(), analytics);
    }

    pub fn get(&self, venue: &VenueId) -> Option<VenueAnalytics> {
        self.venues.get(venue).map(|v| v.clone())
    }

    pub fn snapshot(&self) -> Vec<VenueAnalytics> {
        self.venues.iter().map(|v| v.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}
