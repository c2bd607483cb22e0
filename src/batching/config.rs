//! Batching manager configuration.

use crate::config::ConfigError;
use crate::types::AccountId;
use serde::{Deserialize, Serialize};

/// Batching manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Address the manager holds custody under (staked asset, minted shares).
    pub manager: AccountId,
    /// May register vaults and rotate the keeper.
    pub owner: AccountId,
    /// May execute batches and pause deposits.
    pub keeper: AccountId,
    /// Upper bound on registered vaults.
    pub max_vaults: usize,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Log events at info instead of debug.
    pub verbose: bool,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            manager: AccountId(0xba7c),
            owner: AccountId(0x0a),
            keeper: AccountId(0x0b),
            max_vaults: 10,
            max_events: 100_000,
            verbose: false,
        }
    }
}

impl BatchingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manager.is_null() || self.owner.is_null() || self.keeper.is_null() {
            return Err(ConfigError::InvalidBatching {
                reason: "manager, owner and keeper must be set".to_string(),
            });
        }
        if self.max_vaults == 0 {
            return Err(ConfigError::InvalidBatching {
                reason: "max_vaults must be positive".to_string(),
            });
        }
        if self.max_events == 0 {
            return Err(ConfigError::InvalidBatching {
                reason: "max_events must be positive".to_string(),
            });
        }
        Ok(())
    }
}
