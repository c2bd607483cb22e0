// 4.0: 80/20 range strategy. keeps one concentrated range order sized to the
// vault's assets, follows the TWAP on rebalance, and flattens the net trader
// position once it grows past a share of vault value (a reset).

mod config;
mod core;
mod hooks;
mod rebalance;
mod results;
mod simulation;

pub use config::{RangeStrategyConfig, RangeStrategyParams};
pub use core::{RangeState, RangeStrategy};
pub use results::{CloseOutcome, RangeError, RebalanceResult, WithdrawSimulation};
