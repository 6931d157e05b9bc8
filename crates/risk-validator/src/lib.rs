//! Meridian Risk Validator
//!
//! Limit enforcement for the order engine:
//! - **Pre-trade checks**: position size, order value, daily loss, leverage,
//!   concentration, order rate, fat-finger heuristic, market-hours advisory
//! - **Real-time checks**: the subset re-evaluated against post-fill state
//! - **Runtime limits**: the limit table is mutable without restarting
//!
//! Each check is independent and side-effect-free; the only mutation is the
//! per-account metrics update in `validate_fill`, applied exactly once per
//! fill. Metrics are keyed per account so different accounts never contend.

pub mod limits;
pub mod metrics;
pub mod validator;

pub use limits::{RiskLimit, RiskLimitKind, RiskLimitSet};
pub use metrics::{AccountRiskMetrics, SymbolPosition};
pub use validator::{RiskValidator, ValidatorConfig};
