use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Which phase of the order lifecycle produced a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCheckKind {
    /// Evaluated before any venue submission
    PreTrade,
    /// Re-evaluated against post-fill state
    RealTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCheckStatus {
    Passed,
    Warning,
    Failed,
}

/// Result of one risk rule evaluation
///
/// Immutable once created; appended to the order's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCheck {
    pub rule_id: String,
    pub kind: RiskCheckKind,
    pub status: RiskCheckStatus,
    pub message: String,
    pub limit_value: Decimal,
    pub current_value: Decimal,
    /// current / limit, as a percentage
    pub utilization_pct: Decimal,
    pub checked_at: DateTime<Utc>,
}

impl RiskCheck {
    pub fn new(
        rule_id: impl Into<String>,
        kind: RiskCheckKind,
        status: RiskCheckStatus,
        message: impl Into<String>,
        limit_value: Decimal,
        current_value: Decimal,
    ) -> Self {
        let utilization_pct = if limit_value.is_zero() {
            Decimal::ZERO
        } else {
            current_value / limit_value * dec!(100)
        };
        Self {
            rule_id: rule_id.into(),
            kind,
            status,
            message: message.into(),
            limit_value,
            current_value,
            utilization_pct,
            checked_at: Utc::now(),
        }
    }

    pub fn passed(
        rule_id: impl Into<String>,
        kind: RiskCheckKind,
        limit_value: Decimal,
        current_value: Decimal,
    ) -> Self {
        Self::new(rule_id, kind, RiskCheckStatus::Passed, "within limits", limit_value, current_value)
    }

    pub fn warning(
        rule_id: impl Into<String>,
        kind: RiskCheckKind,
        message: impl Into<String>,
        limit_value: Decimal,
        current_value: Decimal,
    ) -> Self {
        Self::new(rule_id, kind, RiskCheckStatus::Warning, message, limit_value, current_value)
    }

    pub fn failed(
        rule_id: impl Into<String>,
        kind: RiskCheckKind,
        message: impl Into<String>,
        limit_value: Decimal,
        current_value: Decimal,
    ) -> Self {
        Self::new(rule_id, kind, RiskCheckStatus::Failed, message, limit_value, current_value)
    }

    pub fn is_failed(&self) -> bool {
        self.status == RiskCheckStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_is_percentage_of_limit() {
        let check = RiskCheck::passed("position_size", RiskCheckKind::PreTrade, dec!(100), dec!(25));
        assert_eq!(check.utilization_pct, dec!(25));
    }

    #[test]
    fn zero_limit_yields_zero_utilization() {
        let check = RiskCheck::passed("order_rate", RiskCheckKind::PreTrade, Decimal::ZERO, dec!(5));
        assert_eq!(check.utilization_pct, Decimal::ZERO);
    }
}
