//! Connector error types

use meridian_core::VenueId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConnectorError>;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("unknown venue: {0}")]
    UnknownVenue(VenueId),

    #[error("venue {venue} is not connected (status {status})")]
    NotConnected { venue: VenueId, status: String },

    #[error("rate limited on {venue} for {kind}: {current}/{max} in window")]
    RateLimited {
        venue: VenueId,
        kind: String,
        current: usize,
        max: usize,
    },

    #[error("venue {venue} rejected the request: {reason}")]
    VenueRejected { venue: VenueId, reason: String },

    #[error("order type {order_type} not supported by {venue}")]
    UnsupportedOrderType { venue: VenueId, order_type: String },

    #[error("invalid execution report: {0}")]
    InvalidReport(String),

    #[error("transport failure on {venue}: {reason}")]
    Transport { venue: VenueId, reason: String },
}
