//! Meridian Smart Router
//!
//! Decides how to split an order across execution venues:
//! - **Algorithm selection** by order characteristics (size, urgency, cost
//!   sensitivity)
//! - **Venue filtering** on reliability, data freshness, preference lists,
//!   and aggregate liquidity
//! - **Allocation** via one of five algorithms, each a pure function over a
//!   venue analytics snapshot
//!
//! Every routing decision fully allocates the requested quantity: allocation
//! sums equal the order quantity exactly, or routing fails.

pub mod algorithms;
pub mod analytics;
pub mod error;
pub mod router;

pub use analytics::{VenueAnalytics, VenueAnalyticsTable};
pub use error::{Result, RouterError};
pub use router::{RouterConfig, SmartRouter};
