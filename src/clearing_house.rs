// 9.2 clearing_house.rs: the perpetuals clearing house the range strategy trades on.
// treated as an external ledger and swap venue. MOCKED for tests and the simulator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::math::{price_from_sqrt, MathError};
use crate::types::{AccountId, Bps, PoolId, SignedSize};
use crate::venue::VenueError;

// A single add/remove instruction for a concentrated range order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityChangeParams {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity_delta: i128,
    // also flatten the token position the removed liquidity leaves behind
    pub close_token_position: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParams {
    // signed token amount, positive buys
    pub amount: Decimal,
    // None accepts any resulting price
    pub sqrt_price_limit: Option<Decimal>,
    pub is_partial_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    // tokens actually traded, same sign as the request
    pub token_amount: Decimal,
    // quote paid (negative) or received (positive)
    pub quote_amount: Decimal,
}

// Trait for clearing houses. Everything the range strategy needs from the ledger.
pub trait ClearingHouse {
    fn twap_duration(&self, pool: PoolId) -> Result<u32, VenueError>;

    fn twap_sqrt_price(&self, pool: PoolId, duration: u32) -> Result<Decimal, VenueError>;

    fn net_token_position(&self, account: AccountId, pool: PoolId) -> Result<SignedSize, VenueError>;

    fn update_range_order(
        &mut self,
        account: AccountId,
        pool: PoolId,
        params: &LiquidityChangeParams,
    ) -> Result<(), VenueError>;

    fn swap_token(&mut self, account: AccountId, pool: PoolId, params: &SwapParams) -> Result<SwapResult, VenueError>;

    // quote a swap without executing it
    fn simulate_swap(&self, pool: PoolId, params: &SwapParams) -> Result<SwapResult, VenueError>;

    fn update_margin(&mut self, account: AccountId, collateral_delta: Decimal) -> Result<(), VenueError>;
}

// Recorded calls, in submission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearingHouseCall {
    UpdateRangeOrder(LiquidityChangeParams),
    Swap(SwapParams),
    UpdateMargin(Decimal),
}

// Single pool clearing house with a settable TWAP
#[derive(Debug, Clone)]
pub struct MockClearingHouse {
    sqrt_price: Decimal,
    twap_duration: u32,
    // fraction of each swap that fills, 1 = full fill
    pub fill_ratio: Decimal,
    pub swap_fee: Bps,
    positions: HashMap<AccountId, Decimal>,
    margins: HashMap<AccountId, Decimal>,
    range_orders: HashMap<(AccountId, i32, i32), u128>,
    calls: Vec<ClearingHouseCall>,
    pub fail_swap: bool,
    pub fail_range_order: bool,
    pub fail_margin: bool,
}

impl MockClearingHouse {
    pub fn new(sqrt_price: Decimal) -> Self {
        Self {
            sqrt_price,
            twap_duration: 300,
            fill_ratio: Decimal::ONE,
            swap_fee: Bps::new(0),
            positions: HashMap::new(),
            margins: HashMap::new(),
            range_orders: HashMap::new(),
            calls: Vec::new(),
            fail_swap: false,
            fail_range_order: false,
            fail_margin: false,
        }
    }

    pub fn set_sqrt_price(&mut self, sqrt_price: Decimal) {
        self.sqrt_price = sqrt_price;
    }

    pub fn set_net_position(&mut self, account: AccountId, size: Decimal) {
        self.positions.insert(account, size);
    }

    pub fn margin(&self, account: AccountId) -> Decimal {
        self.margins.get(&account).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn range_liquidity(&self, account: AccountId, tick_lower: i32, tick_upper: i32) -> u128 {
        self.range_orders
            .get(&(account, tick_lower, tick_upper))
            .copied()
            .unwrap_or(0)
    }

    pub fn calls(&self) -> &[ClearingHouseCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn execution_price(&self, buying: bool) -> Result<Decimal, MathError> {
        let price = price_from_sqrt(self.sqrt_price)?;
        let fee = self.swap_fee.as_fraction();
        Ok(if buying {
            price * (Decimal::ONE + fee)
        } else {
            price * (Decimal::ONE - fee)
        })
    }

    fn quote(&self, params: &SwapParams) -> Result<SwapResult, VenueError> {
        let filled = if params.is_partial_allowed {
            params.amount * self.fill_ratio
        } else {
            params.amount
        };
        let price = self
            .execution_price(filled > Decimal::ZERO)
            .map_err(|e| VenueError::Rejected(e.to_string()))?;
        Ok(SwapResult {
            token_amount: filled,
            quote_amount: -filled * price,
        })
    }
}

impl ClearingHouse for MockClearingHouse {
    fn twap_duration(&self, _pool: PoolId) -> Result<u32, VenueError> {
        Ok(self.twap_duration)
    }

    fn twap_sqrt_price(&self, _pool: PoolId, _duration: u32) -> Result<Decimal, VenueError> {
        Ok(self.sqrt_price)
    }

    fn net_token_position(&self, account: AccountId, _pool: PoolId) -> Result<SignedSize, VenueError> {
        Ok(SignedSize::new(
            self.positions.get(&account).copied().unwrap_or(Decimal::ZERO),
        ))
    }

    fn update_range_order(
        &mut self,
        account: AccountId,
        _pool: PoolId,
        params: &LiquidityChangeParams,
    ) -> Result<(), VenueError> {
        if self.fail_range_order {
            return Err(VenueError::Rejected("range orders disabled".to_string()));
        }
        let key = (account, params.tick_lower, params.tick_upper);
        let current = self.range_orders.get(&key).copied().unwrap_or(0);
        let delta = params.liquidity_delta.unsigned_abs();

        let updated = if params.liquidity_delta >= 0 {
            current
                .checked_add(delta)
                .ok_or_else(|| VenueError::Rejected("range liquidity overflow".to_string()))?
        } else {
            current.checked_sub(delta).ok_or(VenueError::InsufficientLiquidity)?
        };

        if updated == 0 {
            self.range_orders.remove(&key);
        } else {
            self.range_orders.insert(key, updated);
        }
        if params.close_token_position {
            self.positions.insert(account, Decimal::ZERO);
        }
        self.calls.push(ClearingHouseCall::UpdateRangeOrder(*params));
        Ok(())
    }

    fn swap_token(&mut self, account: AccountId, _pool: PoolId, params: &SwapParams) -> Result<SwapResult, VenueError> {
        if self.fail_swap {
            return Err(VenueError::Rejected("swaps disabled".to_string()));
        }
        let result = self.quote(params)?;
        *self.positions.entry(account).or_insert(Decimal::ZERO) += result.token_amount;
        self.calls.push(ClearingHouseCall::Swap(*params));
        Ok(result)
    }

    fn simulate_swap(&self, _pool: PoolId, params: &SwapParams) -> Result<SwapResult, VenueError> {
        self.quote(params)
    }

    fn update_margin(&mut self, account: AccountId, collateral_delta: Decimal) -> Result<(), VenueError> {
        if self.fail_margin {
            return Err(VenueError::Rejected("margin updates disabled".to_string()));
        }
        *self.margins.entry(account).or_insert(Decimal::ZERO) += collateral_delta;
        self.calls.push(ClearingHouseCall::UpdateMargin(collateral_delta));
        Ok(())
    }
}
