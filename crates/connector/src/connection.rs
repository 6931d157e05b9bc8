//! Per-venue connection state

use crate::config::VenueConfig;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

/// Live state for one venue connection. One per venue, process-lifetime.
#[derive(Debug, Clone)]
pub struct ExchangeConnection {
    pub config: VenueConfig,
    pub status: ConnectionStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    pub orders_submitted: u64,
    pub requests_sent: u64,
    pub errors: u64,
}

impl ExchangeConnection {
    pub fn new(config: VenueConfig) -> Self {
        Self {
            config,
            status: ConnectionStatus::Disconnected,
            last_heartbeat: Utc::now(),
            connected_at: None,
            orders_submitted: 0,
            requests_sent: 0,
            errors: 0,
        }
    }

    pub fn mark_connected(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.connected_at = Some(Utc::now());
        self.last_heartbeat = Utc::now();
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Utc::now();
    }

    /// True when Connected but the last heartbeat is older than `timeout`
    pub fn is_stale(&self, timeout: std::time::Duration, now: DateTime<Utc>) -> bool {
        self.status == ConnectionStatus::Connected
            && now - self.last_heartbeat
                > chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::seconds(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fresh_connection_is_not_stale() {
        let mut conn = ExchangeConnection::new(VenueConfig::new("nyse"));
        conn.mark_connected();
        assert!(!conn.is_stale(Duration::from_secs(30), Utc::now()));
    }

    #[test]
    fn old_heartbeat_is_stale_only_when_connected() {
        let mut conn = ExchangeConnection::new(VenueConfig::new("nyse"));
        let later = Utc::now() + chrono::Duration::seconds(120);

        assert!(!conn.is_stale(Duration::from_secs(30), later));
        conn.mark_connected();
        assert!(conn.is_stale(Duration::from_secs(30), later));
    }
}
