//! Venue adapter trait
//!
//! The seam between the connector and a venue's actual wire protocol.
//! Production adapters (FIX sessions, venue REST/WS clients) implement this
//! trait; tests plug in [`crate::testing::ScriptedVenue`].

use crate::error::Result;
use async_trait::async_trait;
use meridian_core::{OrderChanges, OrderId, OrderType, Side, TimeInForce};
use rust_decimal::Decimal;

/// Order parameters handed to an adapter for submission
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
}

#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Establish the session. Must be safe to call again after a failure.
    async fn connect(&self) -> Result<()>;

    /// Submit an order; returns the venue's order id
    async fn submit_order(&self, request: SubmitRequest) -> Result<String>;

    /// Cancel by venue order id
    async fn cancel_order(&self, venue_order_id: &str) -> Result<()>;

    /// Modify by venue order id
    async fn modify_order(&self, venue_order_id: &str, changes: &OrderChanges) -> Result<()>;
}
