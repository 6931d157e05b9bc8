//! Caller-facing request types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{OrderType, Side, TimeInForce};
use crate::routing::VenueId;

/// Execution urgency, used for routing algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    Normal,
    High,
    Urgent,
}

/// An order submission request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Caller-assigned id for correlation
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Required for limit and stop-limit orders
    pub price: Option<Decimal>,
    /// Required for stop orders
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub account: String,
    pub strategy: Option<String>,
    pub urgency: Urgency,
    /// When non-empty, route only to these venues
    pub preferred_venues: Vec<VenueId>,
    pub excluded_venues: Vec<VenueId>,
    /// Commission ceiling in basis points, if the caller is cost-sensitive
    pub max_commission_bps: Option<Decimal>,
    /// Reference price for slippage measurement
    pub expected_price: Option<Decimal>,
}

impl OrderRequest {
    /// Create a limit order request
    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        account: impl Into<String>,
    ) -> Self {
        Self {
            client_order_id: None,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            stop_price: None,
            time_in_force: TimeInForce::Gtc,
            account: account.into(),
            strategy: None,
            urgency: Urgency::Normal,
            preferred_venues: Vec::new(),
            excluded_venues: Vec::new(),
            max_commission_bps: None,
            expected_price: Some(price),
        }
    }

    /// Create a market order request
    pub fn market(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        account: impl Into<String>,
    ) -> Self {
        Self {
            client_order_id: None,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            // Market orders are always IOC
            time_in_force: TimeInForce::Ioc,
            account: account.into(),
            strategy: None,
            urgency: Urgency::Normal,
            preferred_venues: Vec::new(),
            excluded_venues: Vec::new(),
            max_commission_bps: None,
            expected_price: None,
        }
    }

    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    pub fn with_max_commission_bps(mut self, bps: Decimal) -> Self {
        self.max_commission_bps = Some(bps);
        self
    }

    pub fn with_expected_price(mut self, price: Decimal) -> Self {
        self.expected_price = Some(price);
        self
    }

    /// Shape validation: the checks that need no account or market state
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity <= Decimal::ZERO {
            return Err(format!("quantity must be positive, got {}", self.quantity));
        }
        if self.order_type.requires_price() && self.price.is_none() {
            return Err(format!("{:?} order requires a price", self.order_type));
        }
        if self.order_type.requires_stop_price() && self.stop_price.is_none() {
            return Err(format!("{:?} order requires a stop price", self.order_type));
        }
        Ok(())
    }
}

/// Requested changes for `modify_order`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderChanges {
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
}

impl OrderChanges {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.price.is_none()
            && self.stop_price.is_none()
            && self.time_in_force.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn limit_without_price_fails_validation() {
        let mut request = OrderRequest::limit("BTC-USD", Side::Buy, dec!(1), dec!(50_000), "acct");
        request.price = None;
        assert!(request.validate().is_err());
    }

    #[test]
    fn stop_without_stop_price_fails_validation() {
        let request = OrderRequest::market("BTC-USD", Side::Sell, dec!(1), "acct")
            .with_order_type(OrderType::StopLoss);
        assert!(request.validate().is_err());
    }

    #[test]
    fn non_positive_quantity_fails_validation() {
        let request = OrderRequest::market("BTC-USD", Side::Buy, dec!(0), "acct");
        assert!(request.validate().is_err());
    }

    #[test]
    fn market_orders_are_ioc() {
        let request = OrderRequest::market("ETH-USD", Side::Buy, dec!(2), "acct");
        assert_eq!(request.time_in_force, TimeInForce::Ioc);
        assert!(request.validate().is_ok());
    }
}
