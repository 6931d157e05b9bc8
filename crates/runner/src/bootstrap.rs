//! Engine bootstrap
//!
//! Builder for a fully wired engine: per-venue adapters and analytics go in,
//! an [`EngineHandle`] comes out with the connector monitor, fill loop, and
//! watchdog already running. The caller controls shutdown.

use log::info;
use meridian_connector::{ConnectorConfig, ExchangeConnector, VenueAdapter, VenueConfig};
use meridian_core::EngineEvent;
use meridian_fill_manager::{FillManager, FillManagerConfig};
use meridian_order_manager::{EngineConfig, OrderManager};
use meridian_risk_validator::{RiskLimitSet, RiskValidator, ValidatorConfig};
use meridian_smart_router::{RouterConfig, SmartRouter, VenueAnalytics};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const FILL_CHANNEL_CAPACITY: usize = 4096;
const EVENT_CHANNEL_CAPACITY: usize = 4096;

pub struct EngineBootstrap {
    engine_config: EngineConfig,
    validator_config: ValidatorConfig,
    limits: RiskLimitSet,
    router_config: RouterConfig,
    connector_config: ConnectorConfig,
    fill_config: FillManagerConfig,
    venues: Vec<(VenueConfig, Arc<dyn VenueAdapter>, VenueAnalytics)>,
}

impl Default for EngineBootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBootstrap {
    pub fn new() -> Self {
        Self {
            engine_config: EngineConfig::default(),
            validator_config: ValidatorConfig::default(),
            limits: RiskLimitSet::with_defaults(),
            router_config: RouterConfig::default(),
            connector_config: ConnectorConfig::default(),
            fill_config: FillManagerConfig::default(),
            venues: Vec::new(),
        }
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    pub fn with_validator_config(mut self, config: ValidatorConfig) -> Self {
        self.validator_config = config;
        self
    }

    pub fn with_limits(mut self, limits: RiskLimitSet) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_router_config(mut self, config: RouterConfig) -> Self {
        self.router_config = config;
        self
    }

    pub fn with_connector_config(mut self, config: ConnectorConfig) -> Self {
        self.connector_config = config;
        self
    }

    pub fn with_fill_config(mut self, config: FillManagerConfig) -> Self {
        self.fill_config = config;
        self
    }

    pub fn add_venue(
        mut self,
        config: VenueConfig,
        adapter: Arc<dyn VenueAdapter>,
        analytics: VenueAnalytics,
    ) -> Self {
        self.venues.push((config, adapter, analytics));
        self
    }

    /// Wire everything, connect the venues, and start the background loops
    pub async fn build(self) -> EngineHandle {
        // Preserve partial-fill timing across the engine and fill manager
        let fill_config = FillManagerConfig {
            partial_fill_timeout: self.engine_config.partial_fill_timeout,
            ..self.fill_config
        };

        let (fill_tx, fill_rx) = mpsc::channel(FILL_CHANNEL_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let validator = Arc::new(RiskValidator::new(self.validator_config, self.limits));
        let router = Arc::new(SmartRouter::new(self.router_config));
        let connector = Arc::new(ExchangeConnector::new(
            self.connector_config,
            fill_tx,
            event_tx.clone(),
        ));
        let fills = Arc::new(FillManager::new(fill_config));

        for (config, adapter, analytics) in self.venues {
            connector.add_venue(config, adapter);
            router.update_venue(analytics);
        }
        connector.connect_all().await;

        let engine = Arc::new(OrderManager::new(
            self.engine_config,
            validator,
            Arc::clone(&router),
            Arc::clone(&connector),
            fills,
            event_tx,
        ));

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(Arc::clone(&connector).run_monitor()));
        tasks.push(tokio::spawn(Arc::clone(&engine).run_fill_loop(fill_rx)));
        tasks.push(tokio::spawn(Arc::clone(&engine).run_watchdog()));

        info!("[RUNNER] engine started with {} venue(s)", connector.venues().len());
        EngineHandle {
            engine,
            connector,
            router,
            tasks,
        }
    }
}

/// A running engine and its background tasks
pub struct EngineHandle {
    pub engine: Arc<OrderManager>,
    pub connector: Arc<ExchangeConnector>,
    pub router: Arc<SmartRouter>,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.engine.subscribe()
    }

    /// Stop the background loops. Orders already in flight are dropped.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("[RUNNER] engine stopped");
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
