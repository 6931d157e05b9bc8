use serde::{Deserialize, Serialize};

/// Order types accepted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Execute at current market price
    Market,
    /// Execute at specified price or better
    Limit,
    /// Market order triggered when price reaches stop price
    StopLoss,
    /// Limit order triggered when price reaches stop price
    StopLimit,
}

impl OrderType {
    /// Does this order type require a limit price?
    pub fn requires_price(&self) -> bool {
        matches!(self, OrderType::Limit | OrderType::StopLimit)
    }

    /// Does this order type require a stop price?
    pub fn requires_stop_price(&self) -> bool {
        matches!(self, OrderType::StopLoss | OrderType::StopLimit)
    }
}
