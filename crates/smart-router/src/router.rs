//! Smart Order Router
//!
//! Picks a routing algorithm from order characteristics, filters the venue
//! universe, and produces a [`RoutingDecision`] whose allocations sum to the
//! requested quantity exactly.

use crate::algorithms;
use crate::analytics::{VenueAnalytics, VenueAnalyticsTable};
use crate::error::{Result, RouterError};
use chrono::{Duration, Utc};
use log::{debug, info};
use meridian_core::{OrderRequest, RoutingAlgorithm, RoutingDecision, TimeInForce, Urgency};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Orders at or above this size route for impact minimization
    pub large_order_threshold: Decimal,
    /// Orders at or above this size route dark pools first
    pub block_order_threshold: Decimal,
    /// A commission ceiling at or below this marks the order cost sensitive
    pub cost_sensitive_max_bps: Decimal,
    /// Venues below this reliability are excluded
    pub min_reliability: Decimal,
    /// Analytics older than this are excluded
    pub max_staleness: Duration,
    /// Required aggregate liquidity as a multiple of order quantity
    pub liquidity_safety_buffer: Decimal,
    /// A single venue may not absorb more than this share of its liquidity
    pub max_venue_allocation_pct: Decimal,
    pub weight_execution_quality: Decimal,
    pub weight_fill_rate: Decimal,
    pub weight_cost: Decimal,
    pub weight_reliability: Decimal,
    pub weight_latency: Decimal,
    /// Ceiling on the reported decision confidence
    pub max_confidence: Decimal,
    /// Impact scale in bps at 100% participation
    pub impact_bps_at_full_participation: Decimal,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            large_order_threshold: dec!(5_000),
            block_order_threshold: dec!(50_000),
            cost_sensitive_max_bps: dec!(3),
            min_reliability: dec!(0.8),
            max_staleness: Duration::seconds(30),
            liquidity_safety_buffer: dec!(1.2),
            max_venue_allocation_pct: dec!(0.25),
            weight_execution_quality: dec!(0.30),
            weight_fill_rate: dec!(0.20),
            weight_cost: dec!(0.20),
            weight_reliability: dec!(0.15),
            weight_latency: dec!(0.15),
            max_confidence: dec!(0.99),
            impact_bps_at_full_participation: dec!(10),
        }
    }
}

pub struct SmartRouter {
    config: RouterConfig,
    analytics: VenueAnalyticsTable,
}

impl SmartRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            analytics: VenueAnalyticsTable::new(),
        }
    }

    pub fn analytics(&self) -> &VenueAnalyticsTable {
        &self.analytics
    }

    pub fn update_venue(&self, analytics: VenueAnalytics) {
        self.analytics.upsert(analytics);
    }

    /// Map order characteristics to an algorithm
    pub fn select_algorithm(&self, request: &OrderRequest) -> RoutingAlgorithm {
        if request.quantity >= self.config.block_order_threshold {
            return RoutingAlgorithm::DarkPoolFirst;
        }
        if request.quantity >= self.config.large_order_threshold {
            return RoutingAlgorithm::ImpactMinimization;
        }
        if request.urgency == Urgency::Urgent || request.time_in_force == TimeInForce::Ioc {
            return RoutingAlgorithm::LatencyOptimization;
        }
        if let Some(max_bps) = request.max_commission_bps {
            if max_bps <= self.config.cost_sensitive_max_bps {
                return RoutingAlgorithm::CostMinimization;
            }
        }
        RoutingAlgorithm::BestExecution
    }

    /// Venue universe after reliability, freshness, and preference filters
    fn eligible_venues(&self, request: &OrderRequest) -> Vec<VenueAnalytics> {
        let now = Utc::now();
        self.analytics
            .snapshot()
            .into_iter()
            .filter(|v| v.reliability >= self.config.min_reliability)
            .filter(|v| v.is_fresh(self.config.max_staleness, now))
            .filter(|v| !request.excluded_venues.contains(&v.venue))
            .filter(|v| {
                request.preferred_venues.is_empty()
                    || request.preferred_venues.contains(&v.venue)
            })
            .collect()
    }

    pub fn route_order(&self, request: &OrderRequest) -> Result<RoutingDecision> {
        let venues = self.eligible_venues(request);
        if venues.is_empty() {
            return Err(RouterError::NoVenuesAvailable {
                symbol: request.symbol.clone(),
            });
        }

        let total_liquidity: Decimal = venues.iter().map(|v| v.total_liquidity()).sum();
        let required = request.quantity * self.config.liquidity_safety_buffer;
        if total_liquidity < required {
            return Err(RouterError::InsufficientLiquidity {
                symbol: request.symbol.clone(),
                requested: request.quantity,
                allocatable: total_liquidity,
            });
        }

        let algorithm = self.select_algorithm(request);
        debug!(
            "[ROUTE] {} {} x{} via {:?} over {} venues",
            request.side.as_str(),
            request.symbol,
            request.quantity,
            algorithm,
            venues.len()
        );

        let allocations = algorithms::allocate(
            algorithm,
            request.quantity,
            request.expected_price.or(request.price),
            &venues,
            &self.config,
        )
        .ok_or_else(|| {
            let allocatable: Decimal = venues
                .iter()
                .map(|v| v.total_liquidity() * self.config.max_venue_allocation_pct)
                .sum();
            RouterError::InsufficientLiquidity {
                symbol: request.symbol.clone(),
                requested: request.quantity,
                allocatable,
            }
        })?;

        let expected_cost_bps = weighted_cost(&allocations, request.quantity);
        let participation = request.quantity / total_liquidity;
        let expected_impact_bps =
            self.config.impact_bps_at_full_participation * algorithms::approx_sqrt(participation);
        let confidence = self.confidence(&allocations, &venues, request.quantity);

        info!(
            "[ROUTE] {} x{} -> {} venues, cost {:.2}bps, impact {:.2}bps, confidence {:.2}",
            request.symbol,
            request.quantity,
            allocations.len(),
            expected_cost_bps,
            expected_impact_bps,
            confidence
        );

        Ok(RoutingDecision {
            algorithm,
            allocations,
            expected_cost_bps,
            expected_impact_bps,
            confidence,
            decided_at: Utc::now(),
        })
    }

    /// Allocation-weighted venue reliability, capped
    fn confidence(
        &self,
        allocations: &[meridian_core::VenueAllocation],
        venues: &[VenueAnalytics],
        quantity: Decimal,
    ) -> Decimal {
        if quantity.is_zero() {
            return Decimal::ZERO;
        }
        let weighted: Decimal = allocations
            .iter()
            .filter_map(|a| {
                venues
                    .iter()
                    .find(|v| v.venue == a.venue)
                    .map(|v| v.reliability * a.quantity)
            })
            .sum();
        (weighted / quantity).min(self.config.max_confidence)
    }
}

fn weighted_cost(allocations: &[meridian_core::VenueAllocation], quantity: Decimal) -> Decimal {
    if quantity.is_zero() {
        return Decimal::ZERO;
    }
    allocations
        .iter()
        .map(|a| a.expected_commission_bps * a.quantity)
        .sum::<Decimal>()
        / quantity
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::Side;

    fn make_router() -> SmartRouter {
        let router = SmartRouter::new(RouterConfig::default());
        router.update_venue(
            VenueAnalytics::new("alpha")
                .with_liquidity(dec!(100_000), Decimal::ZERO)
                .with_quality(dec!(0.92), dec!(0.98))
                .with_costs(dec!(2), dec!(1.5))
                .with_latency(dec!(5)),
        );
        router.update_venue(
            VenueAnalytics::new("beta")
                .with_liquidity(dec!(60_000), Decimal::ZERO)
                .with_quality(dec!(0.88), dec!(0.95))
                .with_costs(dec!(1), dec!(2))
                .with_latency(dec!(15)),
        );
        router.update_venue(
            VenueAnalytics::new("midnight")
                .with_liquidity(Decimal::ZERO, dec!(90_000))
                .with_quality(dec!(0.70), dec!(0.90))
                .with_costs(dec!(0.5), dec!(0))
                .with_latency(dec!(40))
                .dark(),
        );
        router
    }

    fn request(quantity: Decimal) -> OrderRequest {
        OrderRequest::limit("AAPL", Side::Buy, quantity, dec!(150), "acct-1")
    }

    #[test]
    fn large_order_selects_impact_minimization_and_fully_allocates() {
        let router = make_router();
        let req = request(dec!(10_000));

        let decision = router.route_order(&req).unwrap();
        assert_eq!(decision.algorithm, RoutingAlgorithm::ImpactMinimization);
        assert_eq!(decision.total_quantity(), dec!(10_000));
    }

    #[test]
    fn block_order_routes_dark_pools_first() {
        let router = make_router();
        let req = request(dec!(55_000));

        let decision = router.route_order(&req).unwrap();
        assert_eq!(decision.algorithm, RoutingAlgorithm::DarkPoolFirst);
        assert_eq!(decision.allocations[0].venue.as_str(), "midnight");
        assert_eq!(decision.total_quantity(), dec!(55_000));
    }

    #[test]
    fn urgent_order_routes_for_latency() {
        let router = make_router();
        let req = request(dec!(100)).with_urgency(Urgency::Urgent);

        let decision = router.route_order(&req).unwrap();
        assert_eq!(decision.algorithm, RoutingAlgorithm::LatencyOptimization);
        assert_eq!(decision.allocations[0].venue.as_str(), "alpha");
    }

    #[test]
    fn tight_commission_budget_routes_for_cost() {
        let router = make_router();
        let req = request(dec!(100)).with_max_commission_bps(dec!(1.5));

        let decision = router.route_order(&req).unwrap();
        assert_eq!(decision.algorithm, RoutingAlgorithm::CostMinimization);
        // midnight carries the lowest effective cost
        assert_eq!(decision.allocations[0].venue.as_str(), "midnight");
    }

    #[test]
    fn excluded_venue_never_receives_flow() {
        let router = make_router();
        let mut req = request(dec!(10_000));
        req.excluded_venues.push("alpha".into());

        let decision = router.route_order(&req).unwrap();
        assert!(decision.allocations.iter().all(|a| a.venue.as_str() != "alpha"));
        assert_eq!(decision.total_quantity(), dec!(10_000));
    }

    #[test]
    fn preferred_venues_restrict_the_universe() {
        let router = make_router();
        let mut req = request(dec!(1_000));
        req.preferred_venues.push("beta".into());

        let decision = router.route_order(&req).unwrap();
        assert_eq!(decision.venue_count(), 1);
        assert_eq!(decision.allocations[0].venue.as_str(), "beta");
    }

    #[test]
    fn empty_universe_is_an_error() {
        let router = SmartRouter::new(RouterConfig::default());
        let err = router.route_order(&request(dec!(100))).unwrap_err();
        assert!(matches!(err, RouterError::NoVenuesAvailable { .. }));
    }

    #[test]
    fn thin_liquidity_is_an_error() {
        let router = SmartRouter::new(RouterConfig::default());
        router.update_venue(
            VenueAnalytics::new("tiny")
                .with_liquidity(dec!(500), Decimal::ZERO)
                .with_quality(dec!(0.9), dec!(0.95)),
        );

        let err = router.route_order(&request(dec!(10_000))).unwrap_err();
        assert!(matches!(err, RouterError::InsufficientLiquidity { .. }));
    }

    #[test]
    fn confidence_is_capped() {
        let router = make_router();
        let decision = router.route_order(&request(dec!(500))).unwrap();
        assert!(decision.confidence <= dec!(0.99));
        assert!(decision.confidence > Decimal::ZERO);
    }

    #[test]
    fn stale_analytics_are_excluded() {
        let router = SmartRouter::new(RouterConfig::default());
        let mut stale = VenueAnalytics::new("old")
            .with_liquidity(dec!(100_000), Decimal::ZERO)
            .with_quality(dec!(0.9), dec!(0.95));
        router.update_venue(stale.clone());
        // upsert stamps updated_at, so rewind it directly through the table
        stale.updated_at = Utc::now() - Duration::seconds(120);
        router.analytics().upsert_raw(stale);

        let err = router.route_order(&request(dec!(100))).unwrap_err();
        assert!(matches!(err, RouterError::NoVenuesAvailable { .. }));
    }
}
