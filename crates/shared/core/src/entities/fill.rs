use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderId, Side};
use crate::routing::VenueId;

/// An atomic execution event reported by a venue
///
/// Immutable and append-only. `fill_id` must be globally unique and is the
/// duplicate-detection key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFill {
    pub fill_id: String,
    pub order_id: OrderId,
    pub venue: VenueId,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub commission: Decimal,
    pub fees: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl OrderFill {
    /// Notional value of the fill (price * quantity)
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}
