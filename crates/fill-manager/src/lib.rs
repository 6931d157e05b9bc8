//! Meridian Fill Manager
//!
//! Deduplicates fills by globally unique fill id, maintains per-order fill
//! aggregations with an incremental VWAP, arms partial-fill timeout deadlines,
//! and answers read-only fill queries.

pub mod aggregation;
pub mod error;
pub mod manager;

pub use aggregation::FillAggregation;
pub use error::{FillError, Result};
pub use manager::{FillManager, FillManagerConfig, FillStats};
