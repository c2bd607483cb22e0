// 3.0.2: result types and errors for batching operations.

use crate::math::MathError;
use crate::types::{AccountId, RoundId, VaultId};
use crate::venue::VenueError;

/// What one vault's batch execution did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub vault_id: VaultId,
    // harvested staked asset pushed to the vault without shares
    pub direct_deposit: u128,
    // the round that was closed, if user deposits were pending
    pub round: Option<RoundId>,
    pub total_staked: u128,
    pub total_shares: u128,
}

/// What a keeper pass over every vault did. Failed vaults keep their
/// pending work for the next pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchAllResult {
    pub executed: Vec<BatchResult>,
    pub failed: Vec<(VaultId, BatchingError)>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchingError {
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("Caller {0} is not authorized")]
    Unauthorized(AccountId),

    #[error("Deposits are paused")]
    Paused,

    #[error("Nothing to deposit")]
    NothingToDeposit,

    #[error("Insufficient shares: {available} available")]
    InsufficientShares { available: u128 },

    #[error("Vault {0:?} not found")]
    VaultNotFound(VaultId),

    #[error("Vault {0} already registered")]
    VaultAlreadyRegistered(AccountId),

    #[error("Vault limit {0} reached")]
    TooManyVaults(usize),

    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}
