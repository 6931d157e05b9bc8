//! Meridian Exchange Connector
//!
//! Manages connections to execution venues: order submission, cancellation,
//! and modification through pluggable [`VenueAdapter`]s, sliding-window rate
//! limiting per (venue, request kind), heartbeat monitoring with automatic
//! reconnection, and translation of venue execution reports into
//! [`meridian_core::OrderFill`]s.

pub mod adapter;
pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
pub mod rate_limit;
pub mod report;
pub mod testing;

pub use adapter::{SubmitRequest, VenueAdapter};
pub use config::{ConnectorConfig, RateLimit, RequestKind, VenueConfig};
pub use connection::{ConnectionStatus, ExchangeConnection};
pub use connector::ExchangeConnector;
pub use error::{ConnectorError, Result};
pub use rate_limit::RateLimiter;
pub use report::{ExecutionKind, ExecutionReport};
