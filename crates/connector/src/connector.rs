//! Exchange connector
//!
//! Owns one [`ExchangeConnection`] per venue, gates every outbound request
//! through the venue's rate limits, and maps venue execution reports back to
//! engine order ids. Trade executions are pushed into the fill channel; the
//! order manager is its single consumer.

use crate::adapter::{SubmitRequest, VenueAdapter};
use crate::config::{ConnectorConfig, RequestKind, VenueConfig};
use crate::connection::{ConnectionStatus, ExchangeConnection};
use crate::error::{ConnectorError, Result};
use crate::rate_limit::RateLimiter;
use crate::report::{ExecutionKind, ExecutionReport};
use chrono::Utc;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use meridian_core::{EngineEvent, OrderChanges, OrderId, VenueId};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

pub struct ExchangeConnector {
    config: ConnectorConfig,
    connections: DashMap<VenueId, ExchangeConnection>,
    adapters: DashMap<VenueId, Arc<dyn VenueAdapter>>,
    limiters: DashMap<(VenueId, RequestKind), RateLimiter<()>>,
    /// (venue, venue order id) -> engine order id
    order_map: DashMap<(VenueId, String), OrderId>,
    fill_tx: mpsc::Sender<meridian_core::OrderFill>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl ExchangeConnector {
    pub fn new(
        config: ConnectorConfig,
        fill_tx: mpsc::Sender<meridian_core::OrderFill>,
        event_tx: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            config,
            connections: DashMap::new(),
            adapters: DashMap::new(),
            limiters: DashMap::new(),
            order_map: DashMap::new(),
            fill_tx,
            event_tx,
        }
    }

    pub fn add_venue(&self, config: VenueConfig, adapter: Arc<dyn VenueAdapter>) {
        let venue = config.venue.clone();
        for (kind, limit) in &config.rate_limits {
            self.limiters.insert(
                (venue.clone(), *kind),
                RateLimiter::new(limit.max_requests, limit.window),
            );
        }
        self.adapters.insert(venue.clone(), adapter);
        self.connections
            .insert(venue.clone(), ExchangeConnection::new(config));
        info!("[CONNECTOR] venue {} registered", venue);
    }

    pub fn venues(&self) -> Vec<VenueId> {
        self.connections.iter().map(|c| c.key().clone()).collect()
    }

    pub fn connection_status(&self, venue: &VenueId) -> Option<ConnectionStatus> {
        self.connections.get(venue).map(|c| c.status)
    }

    pub fn connection_snapshot(&self, venue: &VenueId) -> Option<ExchangeConnection> {
        self.connections.get(venue).map(|c| c.clone())
    }

    /// Heartbeat from the venue session keeps the monitor quiet
    pub fn record_heartbeat(&self, venue: &VenueId) {
        if let Some(mut conn) = self.connections.get_mut(venue) {
            conn.heartbeat();
        }
    }

    /// Connect one venue. Already-Connecting venues are left alone.
    pub async fn connect(&self, venue: &VenueId) -> Result<()> {
        let adapter = self
            .adapters
            .get(venue)
            .map(|a| Arc::clone(&a))
            .ok_or_else(|| ConnectorError::UnknownVenue(venue.clone()))?;

        {
            let mut conn = self
                .connections
                .get_mut(venue)
                .ok_or_else(|| ConnectorError::UnknownVenue(venue.clone()))?;
            if conn.status == ConnectionStatus::Connecting {
                debug!("[CONNECTOR] {} already connecting, skipping", venue);
                return Ok(());
            }
            conn.status = ConnectionStatus::Connecting;
        }

        match adapter.connect().await {
            Ok(()) => {
                if let Some(mut conn) = self.connections.get_mut(venue) {
                    conn.mark_connected();
                }
                info!("[CONNECTOR] {} connected", venue);
                let _ = self.event_tx.send(EngineEvent::ConnectionEstablished {
                    venue: venue.clone(),
                });
                Ok(())
            }
            Err(e) => {
                if let Some(mut conn) = self.connections.get_mut(venue) {
                    conn.status = ConnectionStatus::Error;
                    conn.errors += 1;
                }
                error!("[CONNECTOR] {} connect failed: {}", venue, e);
                let _ = self.event_tx.send(EngineEvent::ConnectionFailed {
                    venue: venue.clone(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    pub async fn connect_all(&self) {
        for venue in self.venues() {
            if let Err(e) = self.connect(&venue).await {
                warn!("[CONNECTOR] {} initial connect failed: {}", venue, e);
            }
        }
    }

    /// Preflight shared by submit/cancel/modify: connection up, rate budget
    /// available. Returns the adapter on success.
    fn preflight(&self, venue: &VenueId, kind: RequestKind) -> Result<Arc<dyn VenueAdapter>> {
        let conn = self
            .connections
            .get(venue)
            .ok_or_else(|| ConnectorError::UnknownVenue(venue.clone()))?;
        if conn.status != ConnectionStatus::Connected {
            return Err(ConnectorError::NotConnected {
                venue: venue.clone(),
                status: conn.status.as_str().to_string(),
            });
        }
        drop(conn);

        if let Some(limiter) = self.limiters.get(&(venue.clone(), kind)) {
            if !limiter.try_acquire(()) {
                return Err(ConnectorError::RateLimited {
                    venue: venue.clone(),
                    kind: kind.as_str().to_string(),
                    current: limiter.in_window(&()),
                    max: limiter.max_requests(),
                });
            }
        }

        self.adapters
            .get(venue)
            .map(|a| Arc::clone(&a))
            .ok_or_else(|| ConnectorError::UnknownVenue(venue.clone()))
    }

    fn record_outcome(&self, venue: &VenueId, ok: bool, submitted_order: bool) {
        if let Some(mut conn) = self.connections.get_mut(venue) {
            conn.requests_sent += 1;
            if ok && submitted_order {
                conn.orders_submitted += 1;
            }
            if !ok {
                conn.errors += 1;
            }
        }
    }

    /// Submit an order allocation to a venue; returns the venue order id
    pub async fn submit_order(&self, venue: &VenueId, request: SubmitRequest) -> Result<String> {
        if let Some(conn) = self.connections.get(venue) {
            if !conn.config.supports(request.order_type) {
                return Err(ConnectorError::UnsupportedOrderType {
                    venue: venue.clone(),
                    order_type: format!("{:?}", request.order_type),
                });
            }
            if !conn.config.supports_tif(request.time_in_force) {
                return Err(ConnectorError::UnsupportedOrderType {
                    venue: venue.clone(),
                    order_type: format!("tif {}", request.time_in_force.as_str()),
                });
            }
        }
        let adapter = self.preflight(venue, RequestKind::Submit)?;

        debug!(
            "[CONNECTOR] submit {} {} x{} to {}",
            request.side.as_str(),
            request.symbol,
            request.quantity,
            venue
        );

        let order_id = request.order_id;
        let result = adapter.submit_order(request).await;
        self.record_outcome(venue, result.is_ok(), true);

        let venue_order_id = result?;
        self.order_map
            .insert((venue.clone(), venue_order_id.clone()), order_id);
        Ok(venue_order_id)
    }

    pub async fn cancel_order(&self, venue: &VenueId, venue_order_id: &str) -> Result<()> {
        let adapter = self.preflight(venue, RequestKind::Cancel)?;
        let result = adapter.cancel_order(venue_order_id).await;
        self.record_outcome(venue, result.is_ok(), false);
        result
    }

    pub async fn modify_order(
        &self,
        venue: &VenueId,
        venue_order_id: &str,
        changes: &OrderChanges,
    ) -> Result<()> {
        let adapter = self.preflight(venue, RequestKind::Modify)?;
        let result = adapter.modify_order(venue_order_id, changes).await;
        self.record_outcome(venue, result.is_ok(), false);
        result
    }

    /// Handle a report from a venue session. Trades become fills on the fill
    /// channel; reports for unknown venue order ids are dropped with a warn.
    pub async fn process_execution_report(&self, report: ExecutionReport) -> Result<()> {
        report.validate()?;
        self.record_heartbeat(&report.venue);

        match report.kind {
            ExecutionKind::Trade => {
                let key = (report.venue.clone(), report.venue_order_id.clone());
                let Some(order_id) = self.order_map.get(&key).map(|id| *id) else {
                    warn!(
                        "[CONNECTOR] dropping trade for unmapped venue order {}:{}",
                        report.venue, report.venue_order_id
                    );
                    if let Some(mut conn) = self.connections.get_mut(&report.venue) {
                        conn.errors += 1;
                    }
                    return Ok(());
                };

                let fill = report.to_fill(order_id);
                debug!(
                    "[CONNECTOR] fill {} {} x{} @ {} ({})",
                    fill.fill_id, fill.symbol, fill.quantity, fill.price, fill.venue
                );
                if self.fill_tx.send(fill).await.is_err() {
                    warn!("[CONNECTOR] fill channel closed, dropping fill");
                }
            }
            ExecutionKind::Reject => {
                warn!(
                    "[CONNECTOR] {} rejected order {}: {}",
                    report.venue,
                    report.venue_order_id,
                    report.reason.as_deref().unwrap_or("no reason given")
                );
            }
            ExecutionKind::Ack | ExecutionKind::Cancel => {
                debug!(
                    "[CONNECTOR] {:?} for {}:{}",
                    report.kind, report.venue, report.venue_order_id
                );
            }
        }
        Ok(())
    }

    /// Heartbeat monitor loop. Runs until the connector is dropped.
    ///
    /// Stale Connected sessions are flagged Error and reconnected.
    /// Reconnection is idempotent; a venue already Connecting is skipped.
    pub async fn run_monitor(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.monitor_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let now = Utc::now();

            let mut to_reconnect = Vec::new();
            for mut conn in self.connections.iter_mut() {
                if conn.is_stale(self.config.heartbeat_timeout, now) {
                    warn!("[CONNECTOR] {} heartbeat stale, marking error", conn.key());
                    conn.status = ConnectionStatus::Error;
                    conn.errors += 1;
                    let _ = self.event_tx.send(EngineEvent::ConnectionLost {
                        venue: conn.key().clone(),
                        reason: "heartbeat timeout".to_string(),
                    });
                }
                if matches!(
                    conn.status,
                    ConnectionStatus::Error | ConnectionStatus::Disconnected
                ) {
                    to_reconnect.push(conn.key().clone());
                }
            }

            // One venue's backoff must not stall heartbeat checks or
            // reconnects of the others
            for venue in to_reconnect {
                let connector = Arc::clone(&self);
                let backoff = self.config.reconnect_backoff;
                tokio::spawn(async move {
                    tokio::time::sleep(backoff).await;
                    if let Err(e) = connector.connect(&venue).await {
                        warn!("[CONNECTOR] {} reconnect failed: {}", venue, e);
                    }
                });
            }
        }
    }
}
