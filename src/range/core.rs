// 4.1 range/core.rs: strategy struct. range state, params, event log.

use super::config::{RangeStrategyConfig, RangeStrategyParams};
use super::results::RangeError;
use crate::clearing_house::ClearingHouse;
use crate::config::ConfigError;
use crate::events::{Event, EventLog, EventPayload, StrategyParamsUpdatedEvent};
use crate::math::{base_range, mul_div_floor, to_decimal, to_u128_floor, BaseRange, MathError};
use crate::types::{AccountId, PoolId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The concentrated range the strategy currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RangeState {
    pub base_tick_lower: i32,
    pub base_tick_upper: i32,
    pub base_liquidity: u128,
    // a reset close is in progress, may span several rebalances
    pub is_reset: bool,
}

impl RangeState {
    pub fn has_range(&self) -> bool {
        self.base_liquidity > 0
    }
}

/** 4.1: all range strategy state lives here. collaborators are passed per call */
#[derive(Debug)]
pub struct RangeStrategy {
    pub(super) config: RangeStrategyConfig,
    pub(super) state: RangeState,
    pub(super) log: EventLog,
    pub(super) current_time: Timestamp,
}

impl RangeStrategy {
    pub fn new(config: RangeStrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: RangeState::default(),
            log: EventLog::new(config.max_events, config.verbose),
            current_time: Timestamp::from_millis(0),
            config,
        })
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn owner(&self) -> AccountId {
        self.config.owner
    }

    pub fn account(&self) -> AccountId {
        self.config.account
    }

    pub fn pool(&self) -> PoolId {
        self.config.pool
    }

    pub fn range_state(&self) -> RangeState {
        self.state
    }

    pub fn is_reset(&self) -> bool {
        self.state.is_reset
    }

    pub fn params(&self) -> &RangeStrategyParams {
        &self.config.params
    }

    pub fn events(&self) -> &[Event] {
        self.log.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.log.recent(count)
    }

    /// Replace the strategy thresholds. Owner only.
    pub fn set_params(&mut self, caller: AccountId, params: RangeStrategyParams) -> Result<(), RangeError> {
        if caller != self.config.owner {
            tracing::warn!(%caller, "owner-only call rejected");
            return Err(RangeError::Unauthorized(caller));
        }
        params.validate()?;

        self.config.params = params;
        self.emit_event(EventPayload::StrategyParamsUpdated(StrategyParamsUpdatedEvent {
            close_position_slippage_sqrt_tolerance_bps: params.close_position_slippage_sqrt_tolerance_bps,
            reset_position_threshold_bps: params.reset_position_threshold_bps,
            min_notional_position_to_close_threshold: params.min_notional_position_to_close_threshold,
            rebalance_price_threshold_bps: params.rebalance_price_threshold_bps,
        }));
        Ok(())
    }

    pub(super) fn twap_sqrt_price<C: ClearingHouse>(&self, ch: &C) -> Result<Decimal, RangeError> {
        let duration = ch.twap_duration(self.config.pool)?;
        Ok(ch.twap_sqrt_price(self.config.pool, duration)?)
    }

    pub(super) fn fresh_range(&self, sqrt_price: Decimal, market_value: Decimal) -> Result<BaseRange, RangeError> {
        Ok(base_range(
            sqrt_price,
            market_value,
            self.config.sqrt_price_factor_pips,
            self.config.tick_spacing,
        )?)
    }

    // base_liquidity * change / base_amount, floored
    pub(super) fn proportional_liquidity(&self, change: Decimal, base_amount: Decimal) -> Result<u128, RangeError> {
        if self.state.base_liquidity == 0 {
            return Ok(0);
        }
        if base_amount <= Decimal::ZERO {
            return Err(RangeError::InvalidInput("base amount"));
        }
        // exact integer path when both amounts are whole units
        if change.fract().is_zero() && base_amount.fract().is_zero() {
            let change = to_u128_floor(change)?;
            let base = to_u128_floor(base_amount)?;
            return Ok(mul_div_floor(self.state.base_liquidity, change, base)?);
        }
        let liquidity = to_decimal(self.state.base_liquidity)?;
        let scaled = liquidity
            .checked_mul(change)
            .and_then(|v| v.checked_div(base_amount))
            .ok_or(MathError::Overflow)?;
        Ok(to_u128_floor(scaled)?)
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        self.log.record(self.current_time, payload);
    }
}
