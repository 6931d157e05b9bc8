//! Allocation algorithms
//!
//! Each algorithm is a pure function from (order quantity, venue snapshot,
//! config) to a set of venue allocations. Shared guarantees:
//! - allocations are non-negative and capped at a fraction of each venue's
//!   total liquidity
//! - the final normalization step makes the allocation sum equal the
//!   requested quantity exactly, or reports failure when venue caps cannot
//!   absorb it

use crate::analytics::VenueAnalytics;
use crate::router::RouterConfig;
use meridian_core::{RoutingAlgorithm, VenueAllocation, VenueScore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Cap for a single venue: a fraction of its displayed + hidden liquidity
fn venue_cap(venue: &VenueAnalytics, config: &RouterConfig) -> Decimal {
    venue.total_liquidity() * config.max_venue_allocation_pct
}

/// Weighted composite score used by best-execution ranking
pub fn score_venue(venue: &VenueAnalytics, config: &RouterConfig) -> VenueScore {
    let execution_quality = venue.fill_rate * venue.reliability;
    let cost_efficiency = Decimal::ONE / (Decimal::ONE + venue.effective_cost_bps);
    let latency = Decimal::ONE / (Decimal::ONE + venue.avg_latency_ms);

    let total = config.weight_execution_quality * execution_quality
        + config.weight_fill_rate * venue.fill_rate
        + config.weight_cost * cost_efficiency
        + config.weight_reliability * venue.reliability
        + config.weight_latency * latency;

    VenueScore {
        execution_quality,
        fill_rate: venue.fill_rate,
        cost_efficiency,
        reliability: venue.reliability,
        latency,
        total,
    }
}

fn make_allocation(
    venue: &VenueAnalytics,
    quantity: Decimal,
    expected_price: Option<Decimal>,
    config: &RouterConfig,
) -> VenueAllocation {
    VenueAllocation {
        venue: venue.venue.clone(),
        quantity,
        expected_price,
        expected_commission_bps: venue.effective_cost_bps,
        score: score_venue(venue, config),
    }
}

/// Greedy allocation over a pre-ranked venue list, bounded by per-venue caps
fn allocate_greedy(
    quantity: Decimal,
    ranked: &[&VenueAnalytics],
    expected_price: Option<Decimal>,
    config: &RouterConfig,
) -> Vec<VenueAllocation> {
    let mut allocations = Vec::new();
    let mut remaining = quantity;

    for venue in ranked {
        if remaining <= Decimal::ZERO {
            break;
        }
        let take = remaining.min(venue_cap(venue, config));
        if take > Decimal::ZERO {
            allocations.push(make_allocation(venue, take, expected_price, config));
            remaining -= take;
        }
    }

    allocations
}

/// Run the selected algorithm, then normalize to a full allocation
///
/// Returns `None` when the venues' caps cannot absorb the quantity.
pub fn allocate(
    algorithm: RoutingAlgorithm,
    quantity: Decimal,
    expected_price: Option<Decimal>,
    venues: &[VenueAnalytics],
    config: &RouterConfig,
) -> Option<Vec<VenueAllocation>> {
    let mut allocations = match algorithm {
        RoutingAlgorithm::BestExecution => best_execution(quantity, expected_price, venues, config),
        RoutingAlgorithm::ImpactMinimization => {
            impact_minimization(quantity, expected_price, venues, config)
        }
        RoutingAlgorithm::LatencyOptimization => {
            latency_optimization(quantity, expected_price, venues, config)
        }
        RoutingAlgorithm::CostMinimization => {
            cost_minimization(quantity, expected_price, venues, config)
        }
        RoutingAlgorithm::DarkPoolFirst => {
            dark_pool_first(quantity, expected_price, venues, config)
        }
    };

    normalize(&mut allocations, quantity, expected_price, venues, config)?;
    allocations.retain(|a| a.quantity > Decimal::ZERO);
    Some(allocations)
}

/// Rank by composite score, fill greedily
fn best_execution(
    quantity: Decimal,
    expected_price: Option<Decimal>,
    venues: &[VenueAnalytics],
    config: &RouterConfig,
) -> Vec<VenueAllocation> {
    let mut ranked: Vec<&VenueAnalytics> = venues.iter().collect();
    ranked.sort_by(|a, b| {
        score_venue(b, config)
            .total
            .cmp(&score_venue(a, config).total)
    });
    allocate_greedy(quantity, &ranked, expected_price, config)
}

/// Spread quantity proportional to each venue's share of total liquidity
fn impact_minimization(
    quantity: Decimal,
    expected_price: Option<Decimal>,
    venues: &[VenueAnalytics],
    config: &RouterConfig,
) -> Vec<VenueAllocation> {
    let total_liquidity: Decimal = venues.iter().map(|v| v.total_liquidity()).sum();
    if total_liquidity.is_zero() {
        return Vec::new();
    }

    venues
        .iter()
        .filter_map(|venue| {
            let share = venue.total_liquidity() / total_liquidity;
            let allocated = (quantity * share).min(venue_cap(venue, config));
            if allocated > Decimal::ZERO {
                Some(make_allocation(venue, allocated, expected_price, config))
            } else {
                None
            }
        })
        .collect()
}

/// Fastest venues first
fn latency_optimization(
    quantity: Decimal,
    expected_price: Option<Decimal>,
    venues: &[VenueAnalytics],
    config: &RouterConfig,
) -> Vec<VenueAllocation> {
    let mut ranked: Vec<&VenueAnalytics> = venues.iter().collect();
    ranked.sort_by(|a, b| a.avg_latency_ms.cmp(&b.avg_latency_ms));
    allocate_greedy(quantity, &ranked, expected_price, config)
}

/// Cheapest effective cost first
fn cost_minimization(
    quantity: Decimal,
    expected_price: Option<Decimal>,
    venues: &[VenueAnalytics],
    config: &RouterConfig,
) -> Vec<VenueAllocation> {
    let mut ranked: Vec<&VenueAnalytics> = venues.iter().collect();
    ranked.sort_by(|a, b| a.effective_cost_bps.cmp(&b.effective_cost_bps));
    allocate_greedy(quantity, &ranked, expected_price, config)
}

/// Hidden liquidity first, lit venues for the remainder
fn dark_pool_first(
    quantity: Decimal,
    expected_price: Option<Decimal>,
    venues: &[VenueAnalytics],
    config: &RouterConfig,
) -> Vec<VenueAllocation> {
    let mut dark: Vec<&VenueAnalytics> = venues.iter().filter(|v| v.dark_pool).collect();
    dark.sort_by(|a, b| b.hidden_liquidity.cmp(&a.hidden_liquidity));

    let mut lit: Vec<&VenueAnalytics> = venues.iter().filter(|v| !v.dark_pool).collect();
    lit.sort_by(|a, b| {
        score_venue(b, config)
            .total
            .cmp(&score_venue(a, config).total)
    });

    let mut allocations = allocate_greedy(quantity, &dark, expected_price, config);
    let dark_total: Decimal = allocations.iter().map(|a| a.quantity).sum();
    allocations.extend(allocate_greedy(
        quantity - dark_total,
        &lit,
        expected_price,
        config,
    ));
    allocations
}

/// Redistribute any shortfall into venues with cap headroom, then assign the
/// final rounding dust to the largest allocation so the sum is exact.
fn normalize(
    allocations: &mut Vec<VenueAllocation>,
    target: Decimal,
    expected_price: Option<Decimal>,
    venues: &[VenueAnalytics],
    config: &RouterConfig,
) -> Option<()> {
    let allocated: Decimal = allocations.iter().map(|a| a.quantity).sum();
    let mut shortfall = target - allocated;

    if shortfall > Decimal::ZERO {
        // Headroom per venue, counting venues the algorithm skipped entirely
        for venue in venues {
            if shortfall <= Decimal::ZERO {
                break;
            }
            let cap = venue_cap(venue, config);
            let current = allocations
                .iter()
                .find(|a| a.venue == venue.venue)
                .map(|a| a.quantity)
                .unwrap_or(Decimal::ZERO);
            let headroom = cap - current;
            if headroom <= Decimal::ZERO {
                continue;
            }

            let add = shortfall.min(headroom);
            match allocations.iter_mut().find(|a| a.venue == venue.venue) {
                Some(existing) => existing.quantity += add,
                None => allocations.push(make_allocation(venue, add, expected_price, config)),
            }
            shortfall -= add;
        }

        if shortfall > Decimal::ZERO {
            return None;
        }
    }

    // Exact-sum correction: place dust on the largest allocation
    let allocated: Decimal = allocations.iter().map(|a| a.quantity).sum();
    let dust = target - allocated;
    if !dust.is_zero() {
        let largest = allocations
            .iter_mut()
            .max_by(|a, b| a.quantity.cmp(&b.quantity))?;
        largest.quantity += dust;
    }

    Some(())
}

/// Newton's method square root, for the impact estimate
pub fn approx_sqrt(x: Decimal) -> Decimal {
    if x <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let mut guess = x / dec!(2);
    if guess.is_zero() {
        guess = dec!(0.001);
    }
    for _ in 0..6 {
        guess = (guess + x / guess) / dec!(2);
    }
    guess
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouterConfig;

    fn make_venue(name: &str, liquidity: Decimal, cost_bps: Decimal, latency: Decimal) -> VenueAnalytics {
        VenueAnalytics::new(name)
            .with_liquidity(liquidity, Decimal::ZERO)
            .with_costs(cost_bps, dec!(2))
            .with_latency(latency)
            .with_quality(dec!(0.9), dec!(0.95))
    }

    fn venues() -> Vec<VenueAnalytics> {
        vec![
            make_venue("alpha", dec!(100_000), dec!(2), dec!(5)),
            make_venue("beta", dec!(50_000), dec!(1), dec!(20)),
            make_venue("gamma", dec!(25_000), dec!(4), dec!(2)),
        ]
    }

    #[test]
    fn every_algorithm_fully_allocates() {
        let config = RouterConfig::default();
        let venues = venues();
        let quantity = dec!(10_000);

        for algorithm in [
            RoutingAlgorithm::BestExecution,
            RoutingAlgorithm::ImpactMinimization,
            RoutingAlgorithm::LatencyOptimization,
            RoutingAlgorithm::CostMinimization,
            RoutingAlgorithm::DarkPoolFirst,
        ] {
            let allocations =
                allocate(algorithm, quantity, None, &venues, &config).expect("allocatable");
            let total: Decimal = allocations.iter().map(|a| a.quantity).sum();
            assert_eq!(total, quantity, "{:?} must fully allocate", algorithm);
            assert!(allocations.iter().all(|a| a.quantity > Decimal::ZERO));
        }
    }

    #[test]
    fn allocations_respect_venue_caps() {
        let config = RouterConfig::default();
        let venues = venues();

        let allocations = allocate(
            RoutingAlgorithm::ImpactMinimization,
            dec!(20_000),
            None,
            &venues,
            &config,
        )
        .unwrap();

        for allocation in &allocations {
            let venue = venues.iter().find(|v| v.venue == allocation.venue).unwrap();
            assert!(allocation.quantity <= venue_cap(venue, &config) + dec!(0.000001));
        }
    }

    #[test]
    fn impact_minimization_weights_by_liquidity() {
        let config = RouterConfig::default();
        let venues = venues();

        let allocations = allocate(
            RoutingAlgorithm::ImpactMinimization,
            dec!(7_000),
            None,
            &venues,
            &config,
        )
        .unwrap();

        let alpha = allocations.iter().find(|a| a.venue.as_str() == "alpha").unwrap();
        let gamma = allocations.iter().find(|a| a.venue.as_str() == "gamma").unwrap();
        assert!(alpha.quantity > gamma.quantity);
    }

    #[test]
    fn latency_optimization_prefers_fast_venues() {
        let config = RouterConfig::default();
        let venues = venues();

        // Small enough to fit inside the fastest venue's cap
        let allocations = allocate(
            RoutingAlgorithm::LatencyOptimization,
            dec!(1_000),
            None,
            &venues,
            &config,
        )
        .unwrap();

        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].venue.as_str(), "gamma");
    }

    #[test]
    fn cost_minimization_prefers_cheap_venues() {
        let config = RouterConfig::default();
        let venues = venues();

        let allocations = allocate(
            RoutingAlgorithm::CostMinimization,
            dec!(1_000),
            None,
            &venues,
            &config,
        )
        .unwrap();

        assert_eq!(allocations[0].venue.as_str(), "beta");
    }

    #[test]
    fn dark_pool_first_uses_hidden_liquidity() {
        let config = RouterConfig::default();
        let mut venues = venues();
        venues.push(
            VenueAnalytics::new("midnight")
                .with_liquidity(Decimal::ZERO, dec!(80_000))
                .with_quality(dec!(0.7), dec!(0.9))
                .dark(),
        );

        let allocations = allocate(
            RoutingAlgorithm::DarkPoolFirst,
            dec!(10_000),
            None,
            &venues,
            &config,
        )
        .unwrap();

        assert_eq!(allocations[0].venue.as_str(), "midnight");
    }

    #[test]
    fn unallocatable_quantity_returns_none() {
        let config = RouterConfig::default();
        let venues = vec![make_venue("tiny", dec!(10), dec!(1), dec!(1))];

        assert!(allocate(RoutingAlgorithm::BestExecution, dec!(1_000), None, &venues, &config).is_none());
    }

    #[test]
    fn sqrt_approximation_is_close() {
        let value = approx_sqrt(dec!(0.25));
        assert!((value - dec!(0.5)).abs() < dec!(0.0001));
    }
}
