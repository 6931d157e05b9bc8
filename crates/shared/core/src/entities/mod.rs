mod fill;
mod order;
mod order_status;
mod order_type;
mod risk_check;
mod side;
mod time_in_force;

pub use fill::OrderFill;
pub use order::{Modification, ModificationSnapshot, Order, OrderId, VenueExecution, VenueExecutionStatus};
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use risk_check::{RiskCheck, RiskCheckKind, RiskCheckStatus};
pub use side::Side;
pub use time_in_force::TimeInForce;
