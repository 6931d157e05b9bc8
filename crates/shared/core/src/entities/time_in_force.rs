use serde::{Deserialize, Serialize};

/// Time-in-force instructions for order validity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good Till Canceled: order remains active until explicitly canceled
    Gtc,
    /// Immediate or Cancel: execute immediately (partially or fully) and cancel unfilled portion
    Ioc,
    /// Fill or Kill: execute immediately and completely, or cancel entire order
    Fok,
    /// Day order: automatically canceled at end of trading day
    Day,
}

impl TimeInForce {
    /// Returns true if partial fills are allowed
    pub fn allows_partial_fill(&self) -> bool {
        !matches!(self, TimeInForce::Fok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "gtc",
            TimeInForce::Ioc => "ioc",
            TimeInForce::Fok => "fok",
            TimeInForce::Day => "day",
        }
    }
}
