//! Meridian Core Domain
//!
//! Pure domain types for the Meridian order management and routing engine.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod events;
pub mod requests;
pub mod routing;

// Re-export commonly used types at crate root
pub use entities::{
    Modification,
    ModificationSnapshot,
    // Core trading entities
    Order,
    OrderFill,
    OrderId,
    OrderStatus,
    OrderType,
    // Risk audit types
    RiskCheck,
    RiskCheckKind,
    RiskCheckStatus,
    Side,
    TimeInForce,
    VenueExecution,
    VenueExecutionStatus,
};
pub use events::{EngineEvent, NotificationSeverity, PerformanceReport};
pub use requests::{OrderChanges, OrderRequest, Urgency};
pub use routing::{RoutingAlgorithm, RoutingDecision, VenueAllocation, VenueId, VenueScore};
