// 4.0.2: result types and errors for range strategy operations.

use super::core::RangeState;
use crate::clearing_house::LiquidityChangeParams;
use crate::config::ConfigError;
use crate::math::MathError;
use crate::types::{AccountId, SignedSize};
use crate::venue::VenueError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a reset close did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOutcome {
    // -net_trader_position
    pub requested: SignedSize,
    pub traded: SignedSize,
    // TWAP notional of the requested trade
    pub notional: Decimal,
    // false for dust closes, which skip the venue
    pub swapped: bool,
    pub reset_cleared: bool,
}

/// What a rebalance submitted and where it left the range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceResult {
    // in submission order, removal before addition
    pub changes: Vec<LiquidityChangeParams>,
    pub range: RangeState,
    // reset detected at the start of the rebalance
    pub is_reset: bool,
    pub close: Option<CloseOutcome>,
}

/// Preview of a withdrawal, computed without touching the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawSimulation {
    // requested amount net of the execution cost of trading out the freed position
    pub adjusted_amount_withdrawn: Decimal,
    pub tokens_to_trade: Decimal,
    pub liquidity_delta: i128,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("Caller {0} is not authorized")]
    Unauthorized(AccountId),

    #[error("No reset in progress")]
    InvalidCloseRequest,

    #[error("Invalid params: {0}")]
    InvalidParams(#[from] ConfigError),

    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}
