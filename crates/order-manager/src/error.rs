//! Engine error taxonomy

use meridian_core::{OrderId, OrderStatus};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error("rejected by risk: {reason}")]
    RiskRejected { reason: String },

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("cannot {action} an order in state {status:?}")]
    InvalidState {
        status: OrderStatus,
        action: &'static str,
    },

    #[error("account {account} rate limit exceeded: {current}/{max} in window")]
    RateLimitExceeded {
        account: String,
        current: usize,
        max: usize,
    },

    #[error("cancel failed for order {0}, no venue accepted the cancel")]
    CancelFailed(OrderId),

    #[error("routing failed: {0}")]
    Routing(#[from] meridian_smart_router::RouterError),

    #[error("venue error: {0}")]
    Venue(#[from] meridian_connector::ConnectorError),
}
