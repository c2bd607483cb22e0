// yield-vault-core: accounting and rebalancing core of an 80/20 range yield vault.
// two engines: a round-based deposit batcher and a range rebalancer.
// all computation is deterministic. collaborators are traits, passed per call.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: VaultId, AccountId, RoundId, SignedSize, Price, Bps
//   2.x  math.rs: ratio conversion, tick/sqrt price, base range sizing
//   3.x  batching/: deposits, keeper batch execution, claims, queries
//   4.x  range/: deposit/withdraw hooks, rebalance, reset close, simulation
//   8.x  config.rs: combined vault config, env presets
//   9.0  venue.rs: collaborator error type, asset pricer
//   9.1  staking.rs: stake-and-deposit venue (mocked)
//   9.2  clearing_house.rs: range orders, swaps, margin (mocked)
//   10.x account.rs: per-vault round accounts and round records
//   11.x events.rs: state transition events for audit

// core modules
pub mod account;
pub mod batching;
pub mod events;
pub mod math;
pub mod range;
pub mod types;

// integration modules
pub mod clearing_house;
pub mod config;
pub mod staking;
pub mod venue;

// re exports for convenience
pub use account::*;
pub use events::*;
pub use types::*;
pub use batching::{BatchAllResult, BatchResult, BatchingConfig, BatchingError, BatchingManager};
pub use clearing_house::{ClearingHouse, ClearingHouseCall, LiquidityChangeParams, MockClearingHouse, SwapParams, SwapResult};
pub use config::{ConfigError, Environment, VaultConfig};
pub use math::{BaseRange, MathError};
pub use range::{
    CloseOutcome, RangeError, RangeState, RangeStrategy, RangeStrategyConfig, RangeStrategyParams,
    RebalanceResult, WithdrawSimulation,
};
pub use staking::{MockStakingVenue, StakingVenue};
pub use venue::{AssetPricer, FixedAssetPrice, VenueError};
