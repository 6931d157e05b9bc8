//! Smart router errors

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("no venues available for {symbol} after filtering")]
    NoVenuesAvailable { symbol: String },

    #[error("insufficient venue liquidity for {symbol}: requested {requested}, allocatable {allocatable}")]
    InsufficientLiquidity {
        symbol: String,
        requested: Decimal,
        allocatable: Decimal,
    },
}

pub type Result<T> = std::result::Result<T, RouterError>;
