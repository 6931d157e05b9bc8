//! Fill manager error types

use meridian_core::OrderId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FillError>;

#[derive(Debug, Error)]
pub enum FillError {
    #[error("duplicate fill id: {fill_id}")]
    DuplicateFill { fill_id: String },

    #[error("fill for untracked order {0}")]
    UntrackedOrder(OrderId),

    #[error("invalid fill: {0}")]
    InvalidFill(String),
}
