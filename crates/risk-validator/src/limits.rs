//! Runtime-mutable risk limit table

use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Categories of enforced limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLimitKind {
    /// Maximum absolute position quantity per symbol
    PositionSize,
    /// Maximum absolute daily loss
    DailyLoss,
    /// Maximum gross exposure / equity ratio
    Leverage,
    /// Maximum share of exposure in one symbol (0..1)
    Concentration,
    /// Maximum notional value per order
    OrderValue,
    /// Maximum orders per rate window
    OrderRate,
}

/// A named limit with a hard ceiling and a warning threshold below it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimit {
    pub id: String,
    pub kind: RiskLimitKind,
    pub hard_limit: Decimal,
    pub warning_threshold: Decimal,
    pub enabled: bool,
}

impl RiskLimit {
    pub fn new(
        id: impl Into<String>,
        kind: RiskLimitKind,
        hard_limit: Decimal,
        warning_threshold: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            hard_limit,
            warning_threshold,
            enabled: true,
        }
    }
}

/// Limit table, mutable at runtime without restarting the validator
#[derive(Debug, Default)]
pub struct RiskLimitSet {
    limits: DashMap<String, RiskLimit>,
}

impl RiskLimitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conservative defaults, one limit per kind
    pub fn with_defaults() -> Self {
        let set = Self::new();
        set.upsert(RiskLimit::new("position_size", RiskLimitKind::PositionSize, dec!(1_000), dec!(800)));
        set.upsert(RiskLimit::new("daily_loss", RiskLimitKind::DailyLoss, dec!(100_000), dec!(75_000)));
        set.upsert(RiskLimit::new("leverage", RiskLimitKind::Leverage, dec!(10), dec!(8)));
        set.upsert(RiskLimit::new("concentration", RiskLimitKind::Concentration, dec!(0.5), dec!(0.35)));
        set.upsert(RiskLimit::new("order_value", RiskLimitKind::OrderValue, dec!(5_000_000), dec!(3_000_000)));
        set.upsert(RiskLimit::new("order_rate", RiskLimitKind::OrderRate, dec!(100), dec!(75)));
        set
    }

    /// Add or replace a limit by id
    pub fn upsert(&self, limit: RiskLimit) {
        self.limits.insert(limit.id.clone(), limit);
    }

    pub fn remove(&self, id: &str) -> Option<RiskLimit> {
        self.limits.remove(id).map(|(_, limit)| limit)
    }

    pub fn get(&self, id: &str) -> Option<RiskLimit> {
        self.limits.get(id).map(|l| l.clone())
    }

    /// First enabled limit of the given kind
    pub fn limit_for(&self, kind: RiskLimitKind) -> Option<RiskLimit> {
        self.limits
            .iter()
            .find(|l| l.kind == kind && l.enabled)
            .map(|l| l.clone())
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}
