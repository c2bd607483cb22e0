// 3.0: batching manager. pools many users' deposits into one upstream deposit per
// round, then hands the minted shares back pro rata using the round's recorded ratio.
// no price oracle: the only exchange rate ever used is total_shares / total_staked.

mod claims;
mod config;
mod core;
mod deposits;
mod execution;
mod queries;
mod results;

pub use config::BatchingConfig;
pub use core::BatchingManager;
pub use results::{BatchAllResult, BatchResult, BatchingError};
