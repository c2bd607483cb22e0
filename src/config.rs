// 8.0 config.rs: all settings in one place. batching roles and limits, range strategy
// sizing and thresholds.
// 8.1 each engine validates its own section, VaultConfig validates both.

use serde::{Deserialize, Serialize};

use crate::batching::BatchingConfig;
use crate::range::{RangeStrategyConfig, RangeStrategyParams};
use crate::types::Bps;

// The complete vault configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    pub batching: BatchingConfig,
    pub strategy: RangeStrategyConfig,
}

impl VaultConfig {
    // Create a configuration preset for testnet
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.batching.verbose = true;
        config.strategy.verbose = true;
        config.strategy.params.min_notional_position_to_close_threshold = rust_decimal::Decimal::ONE;
        config
    }

    // Create a configuration preset for mainnet with conservative settings
    pub fn mainnet_conservative() -> Self {
        let mut config = Self::default();
        config.batching.max_vaults = 4;
        config.strategy.tick_spacing = 60;
        config.strategy.params = RangeStrategyParams {
            close_position_slippage_sqrt_tolerance_bps: Bps::new(50), // 0.5%
            reset_position_threshold_bps: Bps::new(1_000),           // 10%
            min_notional_position_to_close_threshold: rust_decimal::Decimal::new(100, 0),
            rebalance_price_threshold_bps: Bps::new(300), // 3%
        };
        config
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.batching.validate()?;
        self.strategy.validate()?;

        // the strategy owner administers the same vault as the batching owner
        if self.batching.owner != self.strategy.owner {
            return Err(ConfigError::InvalidStrategy {
                reason: "strategy owner must match batching owner".to_string(),
            });
        }
        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid batching config: {reason}")]
    InvalidBatching { reason: String },
    #[error("Invalid strategy config: {reason}")]
    InvalidStrategy { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> VaultConfig {
        match self {
            Environment::Development => VaultConfig::default(),
            Environment::Testnet => VaultConfig::testnet(),
            Environment::Mainnet => VaultConfig::mainnet_conservative(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountId;

    #[test]
    fn test_default_config_valid() {
        let config = VaultConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Development.config().validate().is_ok());
        assert!(Environment::Testnet.config().validate().is_ok());
        assert!(Environment::Mainnet.config().validate().is_ok());
        assert_eq!(Environment::Mainnet.config().strategy.tick_spacing, 60);
    }

    #[test]
    fn test_owner_mismatch() {
        let mut config = VaultConfig::default();
        config.strategy.owner = AccountId(0x99);

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::InvalidStrategy { .. })));
    }

    #[test]
    fn test_invalid_section_propagates() {
        let mut config = VaultConfig::default();
        config.batching.max_vaults = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBatching { .. })));
    }

    #[test]
    fn test_config_serialization() {
        let config = VaultConfig::mainnet_conservative();
        let json = serde_json::to_string(&config).unwrap();
        let back: VaultConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.strategy.params, config.strategy.params);
        assert_eq!(back.batching.keeper, config.batching.keeper);
    }

    #[test]
    fn test_environment_serde_names() {
        let json = serde_json::to_string(&Environment::Testnet).unwrap();
        assert_eq!(json, "\"testnet\"");
    }
}
