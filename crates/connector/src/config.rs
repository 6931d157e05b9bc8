//! Venue and connector configuration

use meridian_core::{OrderType, TimeInForce, VenueId};
use std::collections::HashMap;
use std::time::Duration;

/// Kind of request sent to a venue, for rate-limit bucketing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Submit,
    Cancel,
    Modify,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Submit => "submit",
            RequestKind::Cancel => "cancel",
            RequestKind::Modify => "modify",
        }
    }
}

/// Rate limit for one request kind: at most `max_requests` starts within any
/// trailing `window`
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_requests: usize,
    pub window: Duration,
}

impl RateLimit {
    pub fn per_second(max_requests: usize) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(1),
        }
    }
}

/// Static description of a venue's capabilities and limits
#[derive(Debug, Clone)]
pub struct VenueConfig {
    pub venue: VenueId,
    pub rate_limits: HashMap<RequestKind, RateLimit>,
    pub supported_order_types: Vec<OrderType>,
    pub supported_tifs: Vec<TimeInForce>,
    pub supports_margin: bool,
    pub supports_futures: bool,
    pub supports_options: bool,
}

impl VenueConfig {
    pub fn new(venue: impl Into<VenueId>) -> Self {
        let mut rate_limits = HashMap::new();
        rate_limits.insert(RequestKind::Submit, RateLimit::per_second(10));
        rate_limits.insert(RequestKind::Cancel, RateLimit::per_second(10));
        rate_limits.insert(RequestKind::Modify, RateLimit::per_second(5));

        Self {
            venue: venue.into(),
            rate_limits,
            supported_order_types: vec![
                OrderType::Market,
                OrderType::Limit,
                OrderType::StopLoss,
                OrderType::StopLimit,
            ],
            supported_tifs: vec![
                TimeInForce::Gtc,
                TimeInForce::Ioc,
                TimeInForce::Fok,
                TimeInForce::Day,
            ],
            supports_margin: false,
            supports_futures: false,
            supports_options: false,
        }
    }

    pub fn with_rate_limit(mut self, kind: RequestKind, limit: RateLimit) -> Self {
        self.rate_limits.insert(kind, limit);
        self
    }

    pub fn with_order_types(mut self, order_types: Vec<OrderType>) -> Self {
        self.supported_order_types = order_types;
        self
    }

    pub fn supports(&self, order_type: OrderType) -> bool {
        self.supported_order_types.contains(&order_type)
    }

    pub fn supports_tif(&self, tif: TimeInForce) -> bool {
        self.supported_tifs.contains(&tif)
    }
}

/// Connector-wide timing configuration
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// A connection with no heartbeat for this long is considered dead
    pub heartbeat_timeout: Duration,
    /// How often the monitor loop checks connection health
    pub monitor_interval: Duration,
    /// Pause before a reconnection attempt
    pub reconnect_backoff: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(30),
            monitor_interval: Duration::from_secs(5),
            reconnect_backoff: Duration::from_millis(500),
        }
    }
}
