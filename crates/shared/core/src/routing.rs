//! Routing decision types produced by the smart router

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique identifier for an execution venue
///
/// Stable reference that can be stored in orders and used as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VenueId(pub String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VenueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VenueId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Named allocation algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingAlgorithm {
    /// Default weighted scoring across quality, cost, reliability, latency
    BestExecution,
    /// Spread quantity by liquidity share to minimize market impact
    ImpactMinimization,
    /// Fastest venues first, for urgent or IOC flow
    LatencyOptimization,
    /// Cheapest effective cost first
    CostMinimization,
    /// Hidden liquidity first, lit venues for the remainder
    DarkPoolFirst,
}

/// Score components for one venue, as weighed by the routing algorithm
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueScore {
    pub execution_quality: Decimal,
    pub fill_rate: Decimal,
    pub cost_efficiency: Decimal,
    pub reliability: Decimal,
    pub latency: Decimal,
    pub total: Decimal,
}

/// Quantity routed to a single venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueAllocation {
    pub venue: VenueId,
    pub quantity: Decimal,
    pub expected_price: Option<Decimal>,
    pub expected_commission_bps: Decimal,
    pub score: VenueScore,
}

/// Output of the smart router for one order
///
/// Allocation quantities always sum to the order's requested quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub algorithm: RoutingAlgorithm,
    pub allocations: Vec<VenueAllocation>,
    pub expected_cost_bps: Decimal,
    pub expected_impact_bps: Decimal,
    /// Liquidity-weighted venue reliability, capped below 1.0
    pub confidence: Decimal,
    pub decided_at: DateTime<Utc>,
}

impl RoutingDecision {
    /// Total quantity across all allocations
    pub fn total_quantity(&self) -> Decimal {
        self.allocations.iter().map(|a| a.quantity).sum()
    }

    pub fn venue_count(&self) -> usize {
        self.allocations.len()
    }
}
