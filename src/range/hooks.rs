//! Vault lifecycle hooks. Called by the vault controller around deposits and
//! withdrawals to keep the range order sized to the vault's assets.
//!
//! Every hook plans against a snapshot first, then issues its clearing house
//! calls, then commits. When the second call of a hook fails, the first one
//! is reversed before the error is returned, so neither the strategy nor the
//! clearing house keeps half of the operation.

use super::core::{RangeState, RangeStrategy};
use super::results::RangeError;
use crate::clearing_house::{ClearingHouse, LiquidityChangeParams, SwapParams, SwapResult};
use crate::events::{CollateralSettledEvent, EventPayload, RangeOrderUpdatedEvent};
use crate::math::{to_i128, MathError};
use crate::venue::{AssetPricer, VenueError};
use rust_decimal::Decimal;

// liquidity change and the state it leads to, plus the collateral to move
#[derive(Debug, Clone, Copy)]
pub(super) struct RangePlan {
    pub change: LiquidityChangeParams,
    pub collateral_delta: Decimal,
    pub next: RangeState,
}

impl RangeStrategy {
    /// Grow the range after `amount_deposited` asset units arrived.
    ///
    /// The first deposit into an empty vault opens a fresh range around the
    /// TWAP price sized to the deposit's market value. Later deposits scale
    /// the existing liquidity by the deposit's share of prior assets.
    pub fn after_deposit_ranges<C: ClearingHouse, P: AssetPricer>(
        &mut self,
        ch: &mut C,
        pricer: &P,
        amount_after_deposit: Decimal,
        amount_deposited: Decimal,
    ) -> Result<LiquidityChangeParams, RangeError> {
        let plan = self.plan_deposit(ch, pricer, amount_after_deposit, amount_deposited)?;

        ch.update_margin(self.config.account, plan.collateral_delta)?;
        if plan.change.liquidity_delta != 0 {
            if let Err(err) = ch.update_range_order(self.config.account, self.config.pool, &plan.change) {
                self.unwind_margin(ch, plan.collateral_delta, &err)?;
                return Err(err.into());
            }
        }

        self.commit(&plan);
        Ok(plan.change)
    }

    /// Shrink the range before `amount_withdrawn` asset units leave.
    ///
    /// Liquidity is removed in proportion to the withdrawn share. When that
    /// empties the range, the residual token position is closed with it.
    /// Collateral is released after the range order is updated.
    pub fn before_withdraw_ranges<C: ClearingHouse, P: AssetPricer>(
        &mut self,
        ch: &mut C,
        pricer: &P,
        amount_before_withdraw: Decimal,
        amount_withdrawn: Decimal,
    ) -> Result<LiquidityChangeParams, RangeError> {
        let plan = self.plan_withdraw(pricer, amount_before_withdraw, amount_withdrawn)?;

        let range_updated = plan.change.liquidity_delta != 0 || plan.change.close_token_position;
        if range_updated {
            ch.update_range_order(self.config.account, self.config.pool, &plan.change)?;
        }
        if let Err(err) = ch.update_margin(self.config.account, plan.collateral_delta) {
            if range_updated {
                self.unwind_range_order(ch, &plan.change, &err)?;
            }
            return Err(err.into());
        }

        self.commit(&plan);
        Ok(plan.change)
    }

    /// Trade out the token imbalance a withdrawal frees. Market order, no
    /// price limit. A zero amount is a no-op.
    pub fn before_withdraw_close_position_ranges<C: ClearingHouse>(
        &mut self,
        ch: &mut C,
        tokens_to_trade: Decimal,
    ) -> Result<Option<SwapResult>, RangeError> {
        if tokens_to_trade.is_zero() {
            return Ok(None);
        }
        let params = SwapParams {
            amount: tokens_to_trade,
            sqrt_price_limit: None,
            is_partial_allowed: false,
        };
        let result = ch.swap_token(self.config.account, self.config.pool, &params)?;
        tracing::debug!(
            requested = %tokens_to_trade,
            traded = %result.token_amount,
            quote = %result.quote_amount,
            "withdraw imbalance traded"
        );
        Ok(Some(result))
    }

    pub(super) fn plan_deposit<C: ClearingHouse, P: AssetPricer>(
        &self,
        ch: &C,
        pricer: &P,
        amount_after_deposit: Decimal,
        amount_deposited: Decimal,
    ) -> Result<RangePlan, RangeError> {
        if amount_deposited <= Decimal::ZERO {
            return Err(RangeError::InvalidInput("amount deposited"));
        }
        if amount_after_deposit < amount_deposited {
            return Err(RangeError::InvalidInput("amount after deposit"));
        }
        let price = pricer.asset_price()?.value();
        let deposit_value = amount_deposited * price;
        let amount_before = amount_after_deposit - amount_deposited;
        let mut next = self.state;

        let change = if !self.state.has_range() && amount_before.is_zero() {
            let sqrt_price = self.twap_sqrt_price(ch)?;
            let range = self.fresh_range(sqrt_price, deposit_value)?;
            tracing::debug!(
                tick_lower = range.tick_lower,
                tick_upper = range.tick_upper,
                liquidity = range.liquidity,
                "opening base range"
            );
            next.base_tick_lower = range.tick_lower;
            next.base_tick_upper = range.tick_upper;
            next.base_liquidity = range.liquidity;
            LiquidityChangeParams {
                tick_lower: range.tick_lower,
                tick_upper: range.tick_upper,
                liquidity_delta: to_i128(range.liquidity)?,
                close_token_position: false,
            }
        } else {
            let added = self.proportional_liquidity(amount_deposited, amount_before)?;
            next.base_liquidity = self
                .state
                .base_liquidity
                .checked_add(added)
                .ok_or(MathError::Overflow)?;
            LiquidityChangeParams {
                tick_lower: self.state.base_tick_lower,
                tick_upper: self.state.base_tick_upper,
                liquidity_delta: to_i128(added)?,
                close_token_position: false,
            }
        };

        Ok(RangePlan {
            change,
            collateral_delta: deposit_value,
            next,
        })
    }

    pub(super) fn plan_withdraw<P: AssetPricer>(
        &self,
        pricer: &P,
        amount_before_withdraw: Decimal,
        amount_withdrawn: Decimal,
    ) -> Result<RangePlan, RangeError> {
        if amount_withdrawn <= Decimal::ZERO {
            return Err(RangeError::InvalidInput("amount withdrawn"));
        }
        if amount_before_withdraw < amount_withdrawn {
            return Err(RangeError::InvalidInput("amount before withdraw"));
        }
        let price = pricer.asset_price()?.value();
        let removed = self.proportional_liquidity(amount_withdrawn, amount_before_withdraw)?;

        let mut next = self.state;
        next.base_liquidity = self.state.base_liquidity - removed.min(self.state.base_liquidity);

        Ok(RangePlan {
            change: LiquidityChangeParams {
                tick_lower: self.state.base_tick_lower,
                tick_upper: self.state.base_tick_upper,
                liquidity_delta: -to_i128(removed)?,
                close_token_position: self.state.has_range() && next.base_liquidity == 0,
            },
            collateral_delta: -(amount_withdrawn * price),
            next,
        })
    }

    // reverse a margin update whose follow-up call failed
    fn unwind_margin<C: ClearingHouse>(
        &self,
        ch: &mut C,
        collateral_delta: Decimal,
        cause: &VenueError,
    ) -> Result<(), RangeError> {
        tracing::warn!(%collateral_delta, %cause, "range order failed, reversing margin");
        ch.update_margin(self.config.account, -collateral_delta)?;
        Ok(())
    }

    // re-add liquidity whose margin release failed. a closed token position stays closed
    fn unwind_range_order<C: ClearingHouse>(
        &self,
        ch: &mut C,
        change: &LiquidityChangeParams,
        cause: &VenueError,
    ) -> Result<(), RangeError> {
        tracing::warn!(liquidity_delta = change.liquidity_delta, %cause, "margin update failed, reversing range order");
        if change.liquidity_delta == 0 {
            return Ok(());
        }
        let reverse = LiquidityChangeParams {
            liquidity_delta: -change.liquidity_delta,
            close_token_position: false,
            ..*change
        };
        ch.update_range_order(self.config.account, self.config.pool, &reverse)?;
        Ok(())
    }

    fn commit(&mut self, plan: &RangePlan) {
        self.state = plan.next;
        self.emit_event(EventPayload::CollateralSettled(CollateralSettledEvent {
            account: self.config.account,
            collateral_delta: plan.collateral_delta,
        }));
        if plan.change.liquidity_delta != 0 || plan.change.close_token_position {
            self.emit_event(EventPayload::RangeOrderUpdated(RangeOrderUpdatedEvent {
                tick_lower: plan.change.tick_lower,
                tick_upper: plan.change.tick_upper,
                liquidity_delta: plan.change.liquidity_delta,
                close_token_position: plan.change.close_token_position,
            }));
        }
    }
}
