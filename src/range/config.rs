//! Range strategy configuration.

use crate::config::ConfigError;
use crate::math::PIPS;
use crate::types::{AccountId, Bps, PoolId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Owner-tunable thresholds. Replaced as a whole by `set_params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeStrategyParams {
    /// Sqrt price band around TWAP a reset close may trade through.
    pub close_position_slippage_sqrt_tolerance_bps: Bps,
    /// Net position notional, as a share of vault value, that triggers a reset.
    pub reset_position_threshold_bps: Bps,
    /// Reset closes at or below this notional are skipped as dust.
    pub min_notional_position_to_close_threshold: Decimal,
    /// How far outside the base range the TWAP may drift and still count as in range.
    pub rebalance_price_threshold_bps: Bps,
}

impl Default for RangeStrategyParams {
    fn default() -> Self {
        Self {
            close_position_slippage_sqrt_tolerance_bps: Bps::new(100), // 1%
            reset_position_threshold_bps: Bps::new(2_000),            // 20%
            min_notional_position_to_close_threshold: Decimal::new(10, 0),
            rebalance_price_threshold_bps: Bps::new(500), // 5%
        }
    }
}

impl RangeStrategyParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.close_position_slippage_sqrt_tolerance_bps >= Bps::ONE_HUNDRED_PERCENT {
            return Err(ConfigError::InvalidStrategy {
                reason: "close slippage tolerance must be below 10000 bps".to_string(),
            });
        }
        if self.reset_position_threshold_bps.value() == 0 {
            return Err(ConfigError::InvalidStrategy {
                reason: "reset threshold must be positive".to_string(),
            });
        }
        if self.rebalance_price_threshold_bps >= Bps::ONE_HUNDRED_PERCENT {
            return Err(ConfigError::InvalidStrategy {
                reason: "rebalance price threshold must be below 10000 bps".to_string(),
            });
        }
        if self.min_notional_position_to_close_threshold < Decimal::ZERO {
            return Err(ConfigError::InvalidStrategy {
                reason: "min close notional cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}

/// Range strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeStrategyConfig {
    /// May update strategy params.
    pub owner: AccountId,
    /// Clearing house account holding the range order and token position.
    pub account: AccountId,
    pub pool: PoolId,
    /// Computed range ticks are floored to a multiple of this.
    pub tick_spacing: i32,
    /// Base range sqrt price band, in millionths. 800_000 puts the sqrt bounds
    /// at 0.8x and 1/0.8x the current sqrt price.
    pub sqrt_price_factor_pips: u32,
    pub params: RangeStrategyParams,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Log events at info instead of debug.
    pub verbose: bool,
}

impl Default for RangeStrategyConfig {
    fn default() -> Self {
        Self {
            owner: AccountId(0x0a),
            account: AccountId(0x8020),
            pool: PoolId(1),
            tick_spacing: 10,
            sqrt_price_factor_pips: 800_000,
            params: RangeStrategyParams::default(),
            max_events: 100_000,
            verbose: false,
        }
    }
}

impl RangeStrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_null() || self.account.is_null() {
            return Err(ConfigError::InvalidStrategy {
                reason: "owner and account must be set".to_string(),
            });
        }
        if self.tick_spacing <= 0 {
            return Err(ConfigError::InvalidStrategy {
                reason: "tick spacing must be positive".to_string(),
            });
        }
        if self.sqrt_price_factor_pips == 0 || self.sqrt_price_factor_pips >= PIPS {
            return Err(ConfigError::InvalidStrategy {
                reason: "sqrt price factor must be in (0, 1_000_000)".to_string(),
            });
        }
        if self.max_events == 0 {
            return Err(ConfigError::InvalidStrategy {
                reason: "max_events must be positive".to_string(),
            });
        }
        self.params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        assert!(RangeStrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn full_width_tolerance_rejected() {
        let params = RangeStrategyParams {
            close_position_slippage_sqrt_tolerance_bps: Bps::ONE_HUNDRED_PERCENT,
            ..RangeStrategyParams::default()
        };
        assert!(matches!(params.validate(), Err(ConfigError::InvalidStrategy { .. })));
    }

    #[test]
    fn zero_reset_threshold_rejected() {
        let params = RangeStrategyParams {
            reset_position_threshold_bps: Bps::new(0),
            ..RangeStrategyParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn factor_must_narrow_the_band() {
        let config = RangeStrategyConfig {
            sqrt_price_factor_pips: PIPS,
            ..RangeStrategyConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RangeStrategyConfig {
            tick_spacing: 0,
            ..RangeStrategyConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
