//! Pre-trade and real-time check battery

use crate::limits::{RiskLimitKind, RiskLimitSet};
use crate::metrics::AccountRiskMetrics;
use chrono::{Duration, Timelike, Utc};
use dashmap::DashMap;
use log::warn;
use meridian_core::{Order, OrderFill, RiskCheck, RiskCheckKind, RiskCheckStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Validator configuration
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Trailing window for the order-rate check
    pub order_rate_window: Duration,
    /// Notional above which the fat-finger check fails outright
    pub fat_finger_notional: Decimal,
    /// Maximum tolerated deviation of limit price from mark, as a fraction
    pub max_price_deviation: Decimal,
    /// UTC (open_hour, close_hour) advisory window; None = 24/7 market
    pub market_hours_utc: Option<(u32, u32)>,
    /// Equity assigned to accounts seen for the first time
    pub default_equity: Decimal,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            order_rate_window: Duration::seconds(60),
            fat_finger_notional: dec!(10_000_000),
            max_price_deviation: dec!(0.10),
            market_hours_utc: None,
            default_equity: dec!(1_000_000),
        }
    }
}

/// Evaluates orders and fills against the limit table
///
/// Checks are stateless per call; the per-account metrics the checks read are
/// updated only by `validate_fill` (exactly once per fill) and
/// `record_order`.
pub struct RiskValidator {
    config: ValidatorConfig,
    limits: RiskLimitSet,
    metrics: DashMap<String, AccountRiskMetrics>,
    mark_prices: DashMap<String, Decimal>,
}

impl RiskValidator {
    pub fn new(config: ValidatorConfig, limits: RiskLimitSet) -> Self {
        Self {
            config,
            limits,
            metrics: DashMap::new(),
            mark_prices: DashMap::new(),
        }
    }

    pub fn limits(&self) -> &RiskLimitSet {
        &self.limits
    }

    pub fn update_mark_price(&self, symbol: &str, price: Decimal) {
        self.mark_prices.insert(symbol.to_string(), price);
    }

    /// Record an order submission for the account's rate window
    pub fn record_order(&self, account: &str) {
        self.account_entry(account).record_order(Utc::now());
    }

    pub fn set_equity(&self, account: &str, equity: Decimal) {
        self.account_entry(account).equity = equity;
    }

    /// Snapshot of an account's metrics, if the account has been seen
    pub fn metrics_snapshot(&self, account: &str) -> Option<AccountRiskMetrics> {
        self.metrics.get(account).map(|m| m.clone())
    }

    /// Start-of-day reset across all accounts
    pub fn reset_daily(&self) {
        for mut entry in self.metrics.iter_mut() {
            entry.reset_daily();
        }
    }

    /// Run the pre-trade battery; one `RiskCheck` per applicable rule
    pub fn validate_order(&self, order: &Order) -> Vec<RiskCheck> {
        let metrics = self.account_entry(&order.account).clone();
        let marks = self.mark_snapshot();
        let reference_price = order.price.or_else(|| marks.get(&order.symbol).copied());

        let mut checks = Vec::new();
        checks.extend(self.check_position_size(order, &metrics, RiskCheckKind::PreTrade));
        checks.extend(self.check_order_value(order, reference_price));
        checks.extend(self.check_daily_loss(&metrics, RiskCheckKind::PreTrade));
        checks.extend(self.check_leverage(order, &metrics, &marks, reference_price));
        checks.extend(self.check_concentration(order, &metrics, &marks, reference_price));
        checks.extend(self.check_order_rate(&metrics));
        checks.extend(self.check_fat_finger(order, reference_price, &marks));
        checks.extend(self.check_market_hours());

        for check in checks.iter().filter(|c| c.is_failed()) {
            warn!(
                "[RISK] {} failed for order {}: {}",
                check.rule_id, order.id, check.message
            );
        }
        checks
    }

    /// Apply the fill to the account metrics (once), then re-run the
    /// real-time subset against post-fill state
    pub fn validate_fill(&self, order: &Order, fill: &OrderFill) -> Vec<RiskCheck> {
        let metrics = {
            let mut entry = self.account_entry(&order.account);
            entry.apply_fill(fill);
            entry.clone()
        };
        let marks = self.mark_snapshot();

        let mut checks = Vec::new();
        checks.extend(self.check_daily_loss(&metrics, RiskCheckKind::RealTime));
        checks.extend(self.check_position_size(order, &metrics, RiskCheckKind::RealTime));
        checks.extend(self.check_realtime_leverage(&metrics, &marks));

        for check in checks.iter().filter(|c| c.is_failed()) {
            warn!(
                "[RISK] real-time {} breach on account {}: {}",
                check.rule_id, order.account, check.message
            );
        }
        checks
    }

    fn account_entry(&self, account: &str) -> dashmap::mapref::one::RefMut<'_, String, AccountRiskMetrics> {
        self.metrics
            .entry(account.to_string())
            .or_insert_with(|| AccountRiskMetrics::new(account, self.config.default_equity))
    }

    fn mark_snapshot(&self) -> HashMap<String, Decimal> {
        self.mark_prices
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    fn status_for(value: Decimal, warning: Decimal, hard: Decimal) -> RiskCheckStatus {
        if value > hard {
            RiskCheckStatus::Failed
        } else if value > warning {
            RiskCheckStatus::Warning
        } else {
            RiskCheckStatus::Passed
        }
    }

    fn threshold_check(
        rule_id: &str,
        kind: RiskCheckKind,
        value: Decimal,
        warning: Decimal,
        hard: Decimal,
        message: String,
    ) -> RiskCheck {
        match Self::status_for(value, warning, hard) {
            RiskCheckStatus::Passed => RiskCheck::passed(rule_id, kind, hard, value),
            RiskCheckStatus::Warning => RiskCheck::warning(rule_id, kind, message, hard, value),
            RiskCheckStatus::Failed => RiskCheck::failed(rule_id, kind, message, hard, value),
        }
    }

    fn check_position_size(
        &self,
        order: &Order,
        metrics: &AccountRiskMetrics,
        kind: RiskCheckKind,
    ) -> Option<RiskCheck> {
        let limit = self.limits.limit_for(RiskLimitKind::PositionSize)?;
        let current = metrics.position_quantity(&order.symbol);
        let prospective = match kind {
            // Pre-trade: where the position could end up if fully filled
            RiskCheckKind::PreTrade => {
                let signed = match order.side {
                    meridian_core::Side::Buy => order.remaining_quantity,
                    meridian_core::Side::Sell => -order.remaining_quantity,
                };
                (current + signed).abs()
            }
            // Real-time: the position as it now stands
            RiskCheckKind::RealTime => current.abs(),
        };

        Some(Self::threshold_check(
            &limit.id,
            kind,
            prospective,
            limit.warning_threshold,
            limit.hard_limit,
            format!(
                "position {} for {} against limit {}",
                prospective, order.symbol, limit.hard_limit
            ),
        ))
    }

    fn check_order_value(&self, order: &Order, reference_price: Option<Decimal>) -> Option<RiskCheck> {
        let limit = self.limits.limit_for(RiskLimitKind::OrderValue)?;
        let notional = order.notional(reference_price)?;

        Some(Self::threshold_check(
            &limit.id,
            RiskCheckKind::PreTrade,
            notional,
            limit.warning_threshold,
            limit.hard_limit,
            format!("order notional {} against limit {}", notional, limit.hard_limit),
        ))
    }

    fn check_daily_loss(&self, metrics: &AccountRiskMetrics, kind: RiskCheckKind) -> Option<RiskCheck> {
        let limit = self.limits.limit_for(RiskLimitKind::DailyLoss)?;
        // Only losses count against the limit
        let loss = if metrics.daily_pnl < Decimal::ZERO {
            metrics.daily_pnl.abs()
        } else {
            Decimal::ZERO
        };

        Some(Self::threshold_check(
            &limit.id,
            kind,
            loss,
            limit.warning_threshold,
            limit.hard_limit,
            format!("daily loss {} against limit {}", loss, limit.hard_limit),
        ))
    }

    fn check_leverage(
        &self,
        order: &Order,
        metrics: &AccountRiskMetrics,
        marks: &HashMap<String, Decimal>,
        reference_price: Option<Decimal>,
    ) -> Option<RiskCheck> {
        let limit = self.limits.limit_for(RiskLimitKind::Leverage)?;
        if metrics.equity.is_zero() {
            return None;
        }
        let added_notional = order.notional(reference_price).unwrap_or(Decimal::ZERO);
        let prospective = (metrics.gross_exposure(marks) + added_notional) / metrics.equity;

        Some(Self::threshold_check(
            &limit.id,
            RiskCheckKind::PreTrade,
            prospective,
            limit.warning_threshold,
            limit.hard_limit,
            format!("prospective leverage {:.2} against limit {}", prospective, limit.hard_limit),
        ))
    }

    fn check_realtime_leverage(
        &self,
        metrics: &AccountRiskMetrics,
        marks: &HashMap<String, Decimal>,
    ) -> Option<RiskCheck> {
        let limit = self.limits.limit_for(RiskLimitKind::Leverage)?;
        let leverage = metrics.leverage(marks);

        Some(Self::threshold_check(
            &limit.id,
            RiskCheckKind::RealTime,
            leverage,
            limit.warning_threshold,
            limit.hard_limit,
            format!("leverage {:.2} against limit {}", leverage, limit.hard_limit),
        ))
    }

    /// Share of account equity committed to one symbol if the order fills
    fn check_concentration(
        &self,
        order: &Order,
        metrics: &AccountRiskMetrics,
        _marks: &HashMap<String, Decimal>,
        reference_price: Option<Decimal>,
    ) -> Option<RiskCheck> {
        let limit = self.limits.limit_for(RiskLimitKind::Concentration)?;
        let price = reference_price?;
        if metrics.equity.is_zero() {
            return None;
        }

        let current_symbol = metrics.position_quantity(&order.symbol).abs() * price;
        let added = order.remaining_quantity * price;
        let concentration = (current_symbol + added) / metrics.equity;

        Some(Self::threshold_check(
            &limit.id,
            RiskCheckKind::PreTrade,
            concentration,
            limit.warning_threshold,
            limit.hard_limit,
            format!(
                "concentration {:.2} in {} against limit {}",
                concentration, order.symbol, limit.hard_limit
            ),
        ))
    }

    fn check_order_rate(&self, metrics: &AccountRiskMetrics) -> Option<RiskCheck> {
        let limit = self.limits.limit_for(RiskLimitKind::OrderRate)?;
        let count = metrics.orders_in_window(self.config.order_rate_window, Utc::now());
        // Including the order being validated
        let prospective = Decimal::from(count as u64 + 1);

        Some(Self::threshold_check(
            &limit.id,
            RiskCheckKind::PreTrade,
            prospective,
            limit.warning_threshold,
            limit.hard_limit,
            format!(
                "{} orders in {}s window against limit {}",
                prospective,
                self.config.order_rate_window.num_seconds(),
                limit.hard_limit
            ),
        ))
    }

    /// Fat-finger heuristic: oversized notional or a limit price far from mark
    fn check_fat_finger(
        &self,
        order: &Order,
        reference_price: Option<Decimal>,
        marks: &HashMap<String, Decimal>,
    ) -> Option<RiskCheck> {
        let notional = order.notional(reference_price)?;

        if notional > self.config.fat_finger_notional {
            return Some(RiskCheck::failed(
                "fat_finger",
                RiskCheckKind::PreTrade,
                format!("notional {} exceeds fat-finger ceiling", notional),
                self.config.fat_finger_notional,
                notional,
            ));
        }

        if let (Some(limit_price), Some(mark)) = (order.price, marks.get(&order.symbol).copied()) {
            if !mark.is_zero() {
                let deviation = ((limit_price - mark) / mark).abs();
                return Some(Self::threshold_check(
                    "fat_finger",
                    RiskCheckKind::PreTrade,
                    deviation,
                    self.config.max_price_deviation * dec!(0.5),
                    self.config.max_price_deviation,
                    format!(
                        "limit price {} deviates {:.4} from mark {}",
                        limit_price, deviation, mark
                    ),
                ));
            }
        }

        Some(RiskCheck::passed(
            "fat_finger",
            RiskCheckKind::PreTrade,
            self.config.fat_finger_notional,
            notional,
        ))
    }

    /// Advisory only: a warning outside the configured session, never a failure
    fn check_market_hours(&self) -> Option<RiskCheck> {
        let (open, close) = self.config.market_hours_utc?;
        let hour = Utc::now().hour();
        let in_session = if open <= close {
            hour >= open && hour < close
        } else {
            hour >= open || hour < close
        };

        let limit = Decimal::from(close);
        let current = Decimal::from(hour);
        Some(if in_session {
            RiskCheck::passed("market_hours", RiskCheckKind::PreTrade, limit, current)
        } else {
            RiskCheck::warning(
                "market_hours",
                RiskCheckKind::PreTrade,
                format!("outside session hours {:02}:00-{:02}:00 UTC", open, close),
                limit,
                current,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::RiskLimit;
    use chrono::Utc;
    use meridian_core::{OrderRequest, Side};
    use uuid::Uuid;

    fn make_validator() -> RiskValidator {
        RiskValidator::new(ValidatorConfig::default(), RiskLimitSet::with_defaults())
    }

    fn make_order(quantity: Decimal, price: Decimal) -> Order {
        let request = OrderRequest::limit("BTC-USD", Side::Buy, quantity, price, "acct-1");
        Order::from_request(&request, Utc::now())
    }

    fn make_fill(order: &Order, side: Side, quantity: Decimal, price: Decimal) -> OrderFill {
        OrderFill {
            fill_id: Uuid::new_v4().to_string(),
            order_id: order.id,
            venue: "alpha".into(),
            symbol: order.symbol.clone(),
            side,
            price,
            quantity,
            commission: Decimal::ZERO,
            fees: Decimal::ZERO,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn small_order_passes_all_checks() {
        let validator = make_validator();
        let order = make_order(dec!(1), dec!(50_000));

        let checks = validator.validate_order(&order);
        assert!(!checks.is_empty());
        assert!(checks.iter().all(|c| !c.is_failed()), "checks: {:?}", checks);
    }

    #[test]
    fn oversized_position_fails() {
        let validator = make_validator();
        // Default position limit is 1_000
        let order = make_order(dec!(5_000), dec!(10));

        let checks = validator.validate_order(&order);
        let position = checks.iter().find(|c| c.rule_id == "position_size").unwrap();
        assert_eq!(position.status, RiskCheckStatus::Failed);
    }

    #[test]
    fn daily_loss_breach_reports_absolute_pnl() {
        let validator = make_validator();
        validator.limits().upsert(RiskLimit::new(
            "daily_loss",
            RiskLimitKind::DailyLoss,
            dec!(1_000),
            dec!(750),
        ));

        // Buy at 50k, sell at 48k: realize a 2k loss
        let order = make_order(dec!(1), dec!(50_000));
        validator.validate_fill(&order, &make_fill(&order, Side::Buy, dec!(1), dec!(50_000)));
        let checks =
            validator.validate_fill(&order, &make_fill(&order, Side::Sell, dec!(1), dec!(48_000)));

        let daily = checks.iter().find(|c| c.rule_id == "daily_loss").unwrap();
        assert_eq!(daily.status, RiskCheckStatus::Failed);
        assert_eq!(daily.current_value, dec!(2_000));
        assert_eq!(daily.kind, RiskCheckKind::RealTime);
    }

    #[test]
    fn warning_between_thresholds() {
        let validator = make_validator();
        validator.limits().upsert(RiskLimit::new(
            "order_value",
            RiskLimitKind::OrderValue,
            dec!(100_000),
            dec!(40_000),
        ));

        let order = make_order(dec!(1), dec!(50_000));
        let checks = validator.validate_order(&order);

        let value = checks.iter().find(|c| c.rule_id == "order_value").unwrap();
        assert_eq!(value.status, RiskCheckStatus::Warning);
    }

    #[test]
    fn order_rate_limit_fails_when_window_is_full() {
        let validator = make_validator();
        validator.limits().upsert(RiskLimit::new(
            "order_rate",
            RiskLimitKind::OrderRate,
            dec!(3),
            dec!(2),
        ));

        for _ in 0..3 {
            validator.record_order("acct-1");
        }

        let order = make_order(dec!(1), dec!(50_000));
        let checks = validator.validate_order(&order);
        let rate = checks.iter().find(|c| c.rule_id == "order_rate").unwrap();
        assert_eq!(rate.status, RiskCheckStatus::Failed);
    }

    #[test]
    fn fat_finger_catches_price_far_from_mark() {
        let validator = make_validator();
        validator.update_mark_price("BTC-USD", dec!(50_000));

        // 40% above mark with a 10% tolerance
        let order = make_order(dec!(1), dec!(70_000));
        let checks = validator.validate_order(&order);

        let fat = checks.iter().find(|c| c.rule_id == "fat_finger").unwrap();
        assert_eq!(fat.status, RiskCheckStatus::Failed);
    }

    #[test]
    fn fill_metrics_update_is_applied_once() {
        let validator = make_validator();
        let order = make_order(dec!(2), dec!(50_000));

        validator.validate_fill(&order, &make_fill(&order, Side::Buy, dec!(2), dec!(50_000)));

        let metrics = validator.metrics_snapshot("acct-1").unwrap();
        assert_eq!(metrics.position_quantity("BTC-USD"), dec!(2));
    }
}
