//! Execution reports from venues

use crate::error::{ConnectorError, Result};
use chrono::{DateTime, Utc};
use meridian_core::{OrderFill, OrderId, Side, VenueId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionKind {
    Ack,
    Trade,
    Cancel,
    Reject,
}

/// Normalized execution report as received from a venue session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub venue: VenueId,
    pub venue_order_id: String,
    pub execution_id: String,
    pub kind: ExecutionKind,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub commission: Decimal,
    pub fees: Decimal,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionReport {
    pub fn validate(&self) -> Result<()> {
        if self.venue_order_id.is_empty() {
            return Err(ConnectorError::InvalidReport(
                "empty venue order id".to_string(),
            ));
        }
        if self.execution_id.is_empty() {
            return Err(ConnectorError::InvalidReport("empty execution id".to_string()));
        }
        if self.kind == ExecutionKind::Trade {
            if self.quantity <= Decimal::ZERO {
                return Err(ConnectorError::InvalidReport(format!(
                    "trade with non-positive quantity {}",
                    self.quantity
                )));
            }
            if self.price <= Decimal::ZERO {
                return Err(ConnectorError::InvalidReport(format!(
                    "trade with non-positive price {}",
                    self.price
                )));
            }
        }
        Ok(())
    }

    /// Build the fill for a trade execution, once the venue order id has been
    /// resolved to an engine order id
    pub fn to_fill(&self, order_id: OrderId) -> OrderFill {
        OrderFill {
            fill_id: format!("{}:{}", self.venue, self.execution_id),
            order_id,
            venue: self.venue.clone(),
            symbol: self.symbol.clone(),
            side: self.side,
            price: self.price,
            quantity: self.quantity,
            commission: self.commission,
            fees: self.fees,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn make_report(kind: ExecutionKind) -> ExecutionReport {
        ExecutionReport {
            venue: "nyse".into(),
            venue_order_id: "V-1".to_string(),
            execution_id: "E-1".to_string(),
            kind,
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            price: dec!(150),
            quantity: dec!(100),
            commission: dec!(1),
            fees: dec!(0.1),
            reason: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn trade_report_with_zero_quantity_is_invalid() {
        let mut report = make_report(ExecutionKind::Trade);
        report.quantity = Decimal::ZERO;
        assert!(report.validate().is_err());
    }

    #[test]
    fn cancel_report_ignores_quantity() {
        let mut report = make_report(ExecutionKind::Cancel);
        report.quantity = Decimal::ZERO;
        assert!(report.validate().is_ok());
    }

    #[test]
    fn fill_id_is_scoped_to_the_venue() {
        let report = make_report(ExecutionKind::Trade);
        let fill = report.to_fill(Uuid::new_v4());
        assert_eq!(fill.fill_id, "nyse:E-1");
        assert_eq!(fill.quantity, dec!(100));
    }
}
