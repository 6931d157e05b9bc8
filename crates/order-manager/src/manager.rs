//! Order lifecycle engine
//!
//! `create_order` validates the request synchronously and returns; the risk,
//! routing, and venue submission stages run on a spawned task so callers
//! never wait on venue latency. The fill loop is the single consumer of the
//! connector's fill channel, which serializes all per-order execution-state
//! mutation.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::perf::PerformanceTracker;
use chrono::Utc;
use dashmap::DashMap;
use log::{debug, info, warn};
use meridian_connector::adapter::SubmitRequest;
use meridian_connector::{ExchangeConnector, RateLimiter, RequestKind};
use meridian_core::{
    EngineEvent, Modification, ModificationSnapshot, NotificationSeverity, Order, OrderChanges,
    OrderFill, OrderId, OrderRequest, OrderStatus, RoutingDecision, VenueExecution,
    VenueExecutionStatus,
};
use meridian_fill_manager::{FillError, FillManager};
use meridian_risk_validator::RiskValidator;
use meridian_smart_router::SmartRouter;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

pub struct OrderManager {
    config: EngineConfig,
    orders: DashMap<OrderId, Order>,
    /// Reference price per order for slippage on completion
    expected_prices: DashMap<OrderId, Decimal>,
    validator: Arc<RiskValidator>,
    router: Arc<SmartRouter>,
    connector: Arc<ExchangeConnector>,
    fills: Arc<FillManager>,
    perf: PerformanceTracker,
    account_limiter: RateLimiter<(String, RequestKind)>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl OrderManager {
    pub fn new(
        config: EngineConfig,
        validator: Arc<RiskValidator>,
        router: Arc<SmartRouter>,
        connector: Arc<ExchangeConnector>,
        fills: Arc<FillManager>,
        event_tx: broadcast::Sender<EngineEvent>,
    ) -> Self {
        let account_limiter =
            RateLimiter::new(config.account_rate_limit, config.account_rate_window);
        Self {
            config,
            orders: DashMap::new(),
            expected_prices: DashMap::new(),
            validator,
            router,
            connector,
            fills,
            perf: PerformanceTracker::new(std::time::Duration::from_secs(60)),
            account_limiter,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Legal-transition gate for all status changes. Returns the previous
    /// status, or None when the transition is illegal.
    fn transition(&self, order_id: &OrderId, to: OrderStatus) -> Option<OrderStatus> {
        let mut order = self.orders.get_mut(order_id)?;
        if !order.status.can_transition_to(to) {
            warn!(
                "[ENGINE] illegal transition {:?} -> {:?} for {}",
                order.status, to, order_id
            );
            return None;
        }
        let previous = order.status;
        order.status = to;
        order.updated_at = Utc::now();
        drop(order);

        self.emit(EngineEvent::OrderStatusChanged {
            order_id: *order_id,
            previous,
            status: to,
        });
        Some(previous)
    }

    fn fail_order(&self, order_id: &OrderId, to: OrderStatus, reason: String) {
        self.transition(order_id, to);
        self.emit(EngineEvent::OrderError {
            order_id: *order_id,
            reason,
        });
    }

    /// Request-shape and engine-limit validation, run before any venue work
    fn validate_request(&self, request: &OrderRequest) -> std::result::Result<(), String> {
        request.validate()?;

        if request.quantity > self.config.max_order_size {
            return Err(format!(
                "quantity {} exceeds max order size {}",
                request.quantity, self.config.max_order_size
            ));
        }

        let reference = request.price.or(request.expected_price);
        if let Some(price) = reference {
            let notional = price * request.quantity;
            if notional > self.config.max_notional {
                return Err(format!(
                    "notional {} exceeds max {}",
                    notional, self.config.max_notional
                ));
            }
        }

        // Open means working at a venue; orders still in validation or
        // routing do not count, so a new order never counts against itself.
        let open = self
            .orders
            .iter()
            .filter(|o| o.account == request.account && o.status.is_active())
            .count();
        if open >= self.config.max_open_orders_per_account {
            return Err(format!(
                "account {} has {} open orders (max {})",
                request.account, open, self.config.max_open_orders_per_account
            ));
        }

        Ok(())
    }

    /// Sliding-window gate per (account, request kind). Over-limit callers
    /// fail immediately instead of queuing.
    fn acquire_account_slot(&self, account: &str, kind: RequestKind) -> Result<()> {
        let key = (account.to_string(), kind);
        if self.account_limiter.try_acquire(key.clone()) {
            return Ok(());
        }
        Err(EngineError::RateLimitExceeded {
            account: account.to_string(),
            current: self.account_limiter.in_window(&key),
            max: self.account_limiter.max_requests(),
        })
    }

    /// Accept an order. Returns the stored snapshot once request validation
    /// passes; risk, routing, and submission continue on a spawned task.
    pub async fn create_order(self: &Arc<Self>, request: OrderRequest) -> Result<Order> {
        self.acquire_account_slot(&request.account, RequestKind::Submit)?;

        let order = Order::from_request(&request, Utc::now());
        let order_id = order.id;
        if let Some(reference) = request.expected_price.or(request.price) {
            self.expected_prices.insert(order_id, reference);
        }
        self.orders.insert(order_id, order.clone());
        self.perf.record_order(order.created_at);

        info!(
            "[ENGINE] order {} created: {} {} x{} for {}",
            order_id,
            request.side.as_str(),
            request.symbol,
            request.quantity,
            request.account
        );
        self.emit(EngineEvent::OrderCreated {
            order_id,
            symbol: order.symbol.clone(),
            account: order.account.clone(),
        });

        if let Err(reason) = self.validate_request(&request) {
            self.fail_order(&order_id, OrderStatus::Failed, reason.clone());
            return Err(EngineError::Validation { reason });
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_pipeline(order_id, request).await;
        });

        Ok(self.orders.get(&order_id).map(|o| o.clone()).unwrap_or(order))
    }

    /// Async continuation: pre-trade risk, routing, venue submission
    async fn run_pipeline(self: Arc<Self>, order_id: OrderId, request: OrderRequest) {
        if self.config.pre_trade_risk_enabled && !self.run_pre_trade_risk(&order_id) {
            return;
        }
        self.transition(&order_id, OrderStatus::Validated);
        self.validator.record_order(&request.account);

        let decision = match self.router.route_order(&request) {
            Ok(decision) => decision,
            Err(e) => {
                warn!("[ENGINE] routing failed for {}: {}", order_id, e);
                self.fail_order(&order_id, OrderStatus::Failed, e.to_string());
                self.perf.record_terminal();
                return;
            }
        };

        self.fills
            .track_order(order_id, request.symbol.clone(), request.quantity);
        self.submit_allocations(order_id, &request, decision).await;
    }

    /// Pre-trade risk gate; false means the order was rejected
    fn run_pre_trade_risk(&self, order_id: &OrderId) -> bool {
        let Some(order) = self.orders.get(order_id).map(|o| o.clone()) else {
            return false;
        };
        let checks = self.validator.validate_order(&order);
        let failed: Vec<String> = checks
            .iter()
            .filter(|c| c.is_failed())
            .map(|c| c.message.clone())
            .collect();

        if let Some(mut order) = self.orders.get_mut(order_id) {
            order.risk_checks.extend(checks.iter().cloned());
        }

        if failed.is_empty() {
            return true;
        }

        warn!("[ENGINE] order {} rejected by risk: {:?}", order_id, failed);
        self.emit(EngineEvent::RiskBreach {
            order_id: *order_id,
            account: order.account.clone(),
            checks: checks.into_iter().filter(|c| c.is_failed()).collect(),
        });
        self.fail_order(order_id, OrderStatus::Rejected, failed.join("; "));
        self.perf.record_rejection();
        false
    }

    /// Submit every allocation concurrently. One venue failing only marks
    /// that venue's execution rejected; the order survives on any acceptance.
    async fn submit_allocations(
        &self,
        order_id: OrderId,
        request: &OrderRequest,
        decision: RoutingDecision,
    ) {
        let mut tasks = JoinSet::new();
        for allocation in decision.allocations {
            let connector = Arc::clone(&self.connector);
            let submit = SubmitRequest {
                order_id,
                symbol: request.symbol.clone(),
                side: request.side,
                order_type: request.order_type,
                quantity: allocation.quantity,
                price: request.price,
                time_in_force: request.time_in_force,
            };
            let venue = allocation.venue.clone();
            let quantity = allocation.quantity;
            tasks.spawn(async move {
                let result = connector.submit_order(&venue, submit).await;
                (venue, quantity, result)
            });
        }

        let submitted_at = Utc::now();
        let mut accepted = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let Ok((venue, quantity, result)) = joined else {
                continue;
            };
            let execution = match result {
                Ok(venue_order_id) => {
                    accepted += 1;
                    VenueExecution {
                        venue,
                        venue_order_id: Some(venue_order_id),
                        allocated_quantity: quantity,
                        status: VenueExecutionStatus::Accepted,
                        reject_reason: None,
                        submitted_at,
                    }
                }
                Err(e) => {
                    warn!("[ENGINE] venue {} rejected {}: {}", venue, order_id, e);
                    VenueExecution {
                        venue,
                        venue_order_id: None,
                        allocated_quantity: quantity,
                        status: VenueExecutionStatus::Rejected,
                        reject_reason: Some(e.to_string()),
                        submitted_at,
                    }
                }
            };
            if let Some(mut order) = self.orders.get_mut(&order_id) {
                order.venue_executions.push(execution);
            }
        }

        if accepted > 0 {
            if let Some(mut order) = self.orders.get_mut(&order_id) {
                order.submitted_at = Some(submitted_at);
            }
            self.transition(&order_id, OrderStatus::Submitted);
            if let Some(order) = self.orders.get(&order_id) {
                let latency = (submitted_at - order.created_at).num_milliseconds();
                self.perf.record_submit_latency(submitted_at, latency);
            }
            info!("[ENGINE] order {} submitted to {} venue(s)", order_id, accepted);
        } else {
            self.fills.untrack_order(&order_id);
            self.fail_order(
                &order_id,
                OrderStatus::Failed,
                "no venue accepted the order".to_string(),
            );
            self.perf.record_terminal();
        }
    }

    /// Cancel an active order. All venue cancels failing restores the
    /// previous status and returns `CancelFailed` so the caller can retry.
    pub async fn cancel_order(self: &Arc<Self>, order_id: OrderId, reason: &str) -> Result<Order> {
        let order = self
            .orders
            .get(&order_id)
            .map(|o| o.clone())
            .ok_or(EngineError::OrderNotFound(order_id))?;
        if !order.status.is_active() {
            return Err(EngineError::InvalidState {
                status: order.status,
                action: "cancel",
            });
        }
        self.acquire_account_slot(&order.account, RequestKind::Cancel)?;

        let previous = self
            .transition(&order_id, OrderStatus::PendingCancel)
            .ok_or(EngineError::InvalidState {
                status: order.status,
                action: "cancel",
            })?;
        info!("[ENGINE] canceling order {}: {}", order_id, reason);

        let targets: Vec<(meridian_core::VenueId, String)> = order
            .venue_executions
            .iter()
            .filter(|e| e.status == VenueExecutionStatus::Accepted)
            .filter_map(|e| e.venue_order_id.clone().map(|id| (e.venue.clone(), id)))
            .collect();

        let mut tasks = JoinSet::new();
        for (venue, venue_order_id) in targets.clone() {
            let connector = Arc::clone(&self.connector);
            tasks.spawn(async move {
                let result = connector.cancel_order(&venue, &venue_order_id).await;
                (venue, result.is_ok())
            });
        }

        let mut canceled_venues = Vec::new();
        while let Some(Ok((venue, ok))) = tasks.join_next().await {
            if ok {
                canceled_venues.push(venue);
            }
        }

        if !targets.is_empty() && canceled_venues.is_empty() {
            // No venue accepted the cancel; the order is still working
            self.transition(&order_id, previous);
            return Err(EngineError::CancelFailed(order_id));
        }

        if let Some(mut order) = self.orders.get_mut(&order_id) {
            for execution in &mut order.venue_executions {
                if canceled_venues.contains(&execution.venue) {
                    execution.status = VenueExecutionStatus::Canceled;
                }
            }
        }
        self.transition(&order_id, OrderStatus::Canceled);
        self.fills.untrack_order(&order_id);
        self.perf.record_terminal();
        self.orders
            .get(&order_id)
            .map(|o| o.clone())
            .ok_or(EngineError::OrderNotFound(order_id))
    }

    /// Modify an active order. Applied locally first, then propagated to each
    /// venue best-effort; venue outcomes are recorded per venue with no
    /// cross-venue atomicity.
    pub async fn modify_order(
        self: &Arc<Self>,
        order_id: OrderId,
        changes: OrderChanges,
        reason: &str,
    ) -> Result<Order> {
        if changes.is_empty() {
            return Err(EngineError::Validation {
                reason: "modification contains no changes".to_string(),
            });
        }

        let order = self
            .orders
            .get(&order_id)
            .map(|o| o.clone())
            .ok_or(EngineError::OrderNotFound(order_id))?;
        if !order.status.is_active() {
            return Err(EngineError::InvalidState {
                status: order.status,
                action: "modify",
            });
        }
        self.acquire_account_slot(&order.account, RequestKind::Modify)?;
        if let Some(quantity) = changes.quantity {
            if quantity <= order.executed_quantity {
                return Err(EngineError::Validation {
                    reason: format!(
                        "new quantity {} not above executed {}",
                        quantity, order.executed_quantity
                    ),
                });
            }
        }

        let previous = ModificationSnapshot {
            quantity: order.original_quantity,
            price: order.price,
            stop_price: order.stop_price,
            time_in_force: order.time_in_force,
        };

        let targets: Vec<(meridian_core::VenueId, String)> = order
            .venue_executions
            .iter()
            .filter(|e| e.status == VenueExecutionStatus::Accepted)
            .filter_map(|e| e.venue_order_id.clone().map(|id| (e.venue.clone(), id)))
            .collect();

        // Applied locally first, then propagated; a venue may reject the
        // modification independently with no rollback here
        {
            let mut stored = self
                .orders
                .get_mut(&order_id)
                .ok_or(EngineError::OrderNotFound(order_id))?;
            if let Some(quantity) = changes.quantity {
                stored.original_quantity = quantity;
                stored.remaining_quantity = quantity - stored.executed_quantity;
            }
            if let Some(price) = changes.price {
                stored.price = Some(price);
            }
            if let Some(stop_price) = changes.stop_price {
                stored.stop_price = Some(stop_price);
            }
            if let Some(tif) = changes.time_in_force {
                stored.time_in_force = tif;
            }
            let updated = ModificationSnapshot {
                quantity: stored.original_quantity,
                price: stored.price,
                stop_price: stored.stop_price,
                time_in_force: stored.time_in_force,
            };
            stored.modifications.push(Modification {
                modified_at: Utc::now(),
                reason: reason.to_string(),
                previous,
                updated,
                venue_results: Vec::new(),
            });
            stored.updated_at = Utc::now();
        }

        let mut tasks = JoinSet::new();
        for (venue, venue_order_id) in targets {
            let connector = Arc::clone(&self.connector);
            let changes = changes.clone();
            tasks.spawn(async move {
                let ok = connector
                    .modify_order(&venue, &venue_order_id, &changes)
                    .await
                    .is_ok();
                (venue, ok)
            });
        }
        let mut venue_results = Vec::new();
        while let Some(Ok((venue, ok))) = tasks.join_next().await {
            if !ok {
                warn!("[ENGINE] modify not applied at {} for {}", venue, order_id);
            }
            venue_results.push((venue, ok));
        }

        let mut stored = self
            .orders
            .get_mut(&order_id)
            .ok_or(EngineError::OrderNotFound(order_id))?;
        if let Some(entry) = stored.modifications.last_mut() {
            entry.venue_results = venue_results;
        }
        let snapshot = stored.clone();
        drop(stored);

        debug!("[ENGINE] order {} modified: {}", order_id, reason);
        Ok(snapshot)
    }

    /// Single consumer of the connector's fill channel
    pub async fn run_fill_loop(self: Arc<Self>, mut fill_rx: mpsc::Receiver<OrderFill>) {
        while let Some(fill) = fill_rx.recv().await {
            self.handle_fill(fill);
        }
        info!("[ENGINE] fill channel closed, fill loop exiting");
    }

    fn handle_fill(&self, fill: OrderFill) {
        // A venue can report an execution after a cancel won the race.
        // Terminal orders never mutate; drop the fill and surface it so the
        // caller can reconcile with the venue.
        if let Some(order) = self.orders.get(&fill.order_id) {
            if order.status.is_terminal() {
                let status = order.status;
                drop(order);
                warn!(
                    "[ENGINE] fill {} arrived for terminal ({:?}) order {}, dropping",
                    fill.fill_id, status, fill.order_id
                );
                self.emit(EngineEvent::Notification {
                    severity: NotificationSeverity::Warning,
                    message: format!(
                        "fill {} reported for terminal order {}",
                        fill.fill_id, fill.order_id
                    ),
                });
                return;
            }
        }

        match self.fills.process_fill(fill.clone()) {
            Ok(_) => {}
            Err(FillError::DuplicateFill { fill_id }) => {
                warn!("[ENGINE] dropping duplicate fill {}", fill_id);
                return;
            }
            Err(e) => {
                warn!("[ENGINE] dropping bad fill {}: {}", fill.fill_id, e);
                return;
            }
        }

        let Some(mut order) = self.orders.get_mut(&fill.order_id) else {
            warn!("[ENGINE] fill {} for unknown order {}", fill.fill_id, fill.order_id);
            return;
        };
        order.apply_fill(
            fill.quantity,
            fill.price,
            fill.commission,
            fill.fees,
            fill.timestamp,
        );
        let snapshot = order.clone();
        drop(order);

        self.perf.record_fill(fill.timestamp);
        self.emit(EngineEvent::Fill { fill: fill.clone() });

        if snapshot.is_filled() {
            self.transition(&fill.order_id, OrderStatus::Filled);
            let slippage = self
                .expected_prices
                .get(&fill.order_id)
                .and_then(|expected| snapshot.slippage(*expected));
            let time_to_fill_ms = (fill.timestamp - snapshot.created_at).num_milliseconds();
            self.perf.record_completion(fill.timestamp, slippage);
            info!(
                "[ENGINE] order {} filled: avg {:?}, {}ms",
                fill.order_id, snapshot.avg_fill_price, time_to_fill_ms
            );
            self.emit(EngineEvent::OrderComplete {
                order_id: fill.order_id,
                avg_fill_price: snapshot.avg_fill_price,
                slippage,
                time_to_fill_ms,
            });
        } else if snapshot.status != OrderStatus::PartiallyFilled {
            self.transition(&fill.order_id, OrderStatus::PartiallyFilled);
        }

        if self.config.real_time_risk_enabled {
            let checks = self.validator.validate_fill(&snapshot, &fill);
            let failed: Vec<_> = checks.iter().filter(|c| c.is_failed()).cloned().collect();
            if let Some(mut order) = self.orders.get_mut(&fill.order_id) {
                order.risk_checks.extend(checks);
            }
            // Breaches are surfaced, never auto-canceled
            if !failed.is_empty() {
                warn!(
                    "[ENGINE] real-time risk breach on {}: {} check(s)",
                    fill.order_id,
                    failed.len()
                );
                self.emit(EngineEvent::RiskBreach {
                    order_id: fill.order_id,
                    account: snapshot.account.clone(),
                    checks: failed,
                });
            }
        }
    }

    /// Watchdog: surfaces partial-fill timeouts and periodic performance
    /// metrics
    pub async fn run_watchdog(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.watchdog_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let now = Utc::now();

            for order_id in self.fills.poll_timeouts(now) {
                if let Some(order) = self.orders.get(&order_id) {
                    warn!(
                        "[ENGINE] partial fill timeout on {}: {} of {} filled",
                        order_id, order.executed_quantity, order.original_quantity
                    );
                    self.emit(EngineEvent::PartialFillTimeout {
                        order_id,
                        filled_quantity: order.executed_quantity,
                        remaining_quantity: order.remaining_quantity,
                    });
                }
            }

            self.emit(EngineEvent::PerformanceMetrics {
                report: self.perf.report(now),
                at: now,
            });
        }
    }

    pub fn get_order(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.get(order_id).map(|o| o.clone())
    }

    pub fn orders_by_symbol(&self, symbol: &str) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| o.symbol == symbol)
            .map(|o| o.clone())
            .collect()
    }

    pub fn orders_by_account(&self, account: &str) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| o.account == account)
            .map(|o| o.clone())
            .collect()
    }

    pub fn active_orders(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| o.status.is_active())
            .map(|o| o.clone())
            .collect()
    }

    pub fn performance(&self) -> meridian_core::PerformanceReport {
        self.perf.report(Utc::now())
    }
}
