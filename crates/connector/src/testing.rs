//! Deterministic venue fake for tests
//!
//! `ScriptedVenue` implements [`VenueAdapter`] with fully scripted outcomes:
//! no randomness, no timers. Tests script per-call accept/reject behavior and
//! inspect the captured requests afterwards.

use crate::adapter::{SubmitRequest, VenueAdapter};
use crate::error::{ConnectorError, Result};
use async_trait::async_trait;
use meridian_core::OrderChanges;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Accept,
    Reject(String),
}

pub struct ScriptedVenue {
    connect_ok: AtomicBool,
    /// Outcomes consumed front-to-back; empty queue means Accept
    script: Mutex<VecDeque<ScriptedOutcome>>,
    next_id: AtomicU64,
    pub submitted: Mutex<Vec<SubmitRequest>>,
    pub canceled: Mutex<Vec<String>>,
    pub modified: Mutex<Vec<(String, OrderChanges)>>,
}

impl ScriptedVenue {
    /// Connects and accepts everything
    pub fn accepting() -> Self {
        Self {
            connect_ok: AtomicBool::new(true),
            script: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            submitted: Mutex::new(Vec::new()),
            canceled: Mutex::new(Vec::new()),
            modified: Mutex::new(Vec::new()),
        }
    }

    /// Fails every connect attempt
    pub fn refusing() -> Self {
        let venue = Self::accepting();
        venue.connect_ok.store(false, Ordering::SeqCst);
        venue
    }

    /// Queue an outcome for the next scripted call
    pub fn push_outcome(&self, outcome: ScriptedOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Flip connect behavior, for reconnection tests
    pub fn set_connectable(&self, ok: bool) {
        self.connect_ok.store(ok, Ordering::SeqCst);
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedOutcome::Accept)
    }

    fn apply_outcome<T>(&self, accepted: T) -> Result<T> {
        match self.next_outcome() {
            ScriptedOutcome::Accept => Ok(accepted),
            ScriptedOutcome::Reject(reason) => Err(ConnectorError::VenueRejected {
                venue: "scripted".into(),
                reason,
            }),
        }
    }
}

#[async_trait]
impl VenueAdapter for ScriptedVenue {
    async fn connect(&self) -> Result<()> {
        if self.connect_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConnectorError::Transport {
                venue: "scripted".into(),
                reason: "connection refused".to_string(),
            })
        }
    }

    async fn submit_order(&self, request: SubmitRequest) -> Result<String> {
        self.submitted.lock().unwrap().push(request);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.apply_outcome(format!("SV-{id}"))
    }

    async fn cancel_order(&self, venue_order_id: &str) -> Result<()> {
        self.canceled.lock().unwrap().push(venue_order_id.to_string());
        self.apply_outcome(())
    }

    async fn modify_order(&self, venue_order_id: &str, changes: &OrderChanges) -> Result<()> {
        self.modified
            .lock()
            .unwrap()
            .push((venue_order_id.to_string(), changes.clone()));
        self.apply_outcome(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{OrderType, Side, TimeInForce};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn make_request() -> SubmitRequest {
        SubmitRequest {
            order_id: Uuid::new_v4(),
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            quantity: dec!(10),
            price: None,
            time_in_force: TimeInForce::Gtc,
        }
    }

    #[tokio::test]
    async fn outcomes_are_consumed_in_order() {
        let venue = ScriptedVenue::accepting();
        venue.push_outcome(ScriptedOutcome::Reject("no capacity".to_string()));

        assert!(venue.submit_order(make_request()).await.is_err());
        assert!(venue.submit_order(make_request()).await.is_ok());
        assert_eq!(venue.submitted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn venue_order_ids_are_sequential() {
        let venue = ScriptedVenue::accepting();
        let a = venue.submit_order(make_request()).await.unwrap();
        let b = venue.submit_order(make_request()).await.unwrap();
        assert_eq!(a, "SV-1");
        assert_eq!(b, "SV-2");
    }
}
