//! Engine configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard cap on a single order's quantity
    pub max_order_size: Decimal,
    /// Hard cap on a single order's notional value
    pub max_notional: Decimal,
    /// Ceiling on simultaneously active orders per account
    pub max_open_orders_per_account: usize,
    /// Per-account submissions admitted within the rate window
    pub account_rate_limit: usize,
    pub account_rate_window: Duration,
    pub pre_trade_risk_enabled: bool,
    pub real_time_risk_enabled: bool,
    /// Forwarded to the fill manager's partial-fill deadline
    pub partial_fill_timeout: Duration,
    /// How often the watchdog polls for expired deadlines
    pub watchdog_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_order_size: dec!(1_000_000),
            max_notional: dec!(50_000_000),
            max_open_orders_per_account: 100,
            account_rate_limit: 50,
            account_rate_window: Duration::from_secs(1),
            pre_trade_risk_enabled: true,
            real_time_risk_enabled: true,
            partial_fill_timeout: Duration::from_secs(300),
            watchdog_interval: Duration::from_secs(5),
        }
    }
}
