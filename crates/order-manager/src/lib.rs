//! Meridian Order Manager
//!
//! The order lifecycle engine. Accepts order requests, validates them,
//! gates them through pre-trade risk, routes them across venues, submits
//! allocations concurrently, and consumes the fill stream as the single
//! writer of per-order execution state.
//!
//! All outcomes surface on a broadcast [`meridian_core::EngineEvent`] stream.

pub mod config;
pub mod error;
pub mod manager;
pub mod perf;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use manager::OrderManager;
pub use perf::PerformanceTracker;
