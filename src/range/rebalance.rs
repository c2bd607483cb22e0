//! Rebalancing and reset handling.

use super::core::RangeStrategy;
use super::results::{CloseOutcome, RangeError, RebalanceResult};
use crate::clearing_house::{ClearingHouse, LiquidityChangeParams, SwapParams};
use crate::events::{EventPayload, RangeOrderUpdatedEvent, RebalancedEvent, TokenPositionClosedEvent};
use crate::math::{price_from_sqrt, sqrt_price_limit, to_i128, token_notional, widened_band};
use crate::types::SignedSize;
use rust_decimal::Decimal;

impl RangeStrategy {
    /// True when the account's net token position, priced at TWAP, is worth
    /// more than `reset_position_threshold_bps` of the vault's market value.
    pub fn check_is_reset<C: ClearingHouse>(&self, ch: &C, vault_market_value: Decimal) -> Result<bool, RangeError> {
        let sqrt_price = self.twap_sqrt_price(ch)?;
        self.is_reset_at(ch, sqrt_price, vault_market_value)
    }

    /// True when the TWAP price sits inside the base range widened by
    /// `rebalance_price_threshold_bps`, or when a reset condition holds.
    pub fn is_valid_rebalance_range<C: ClearingHouse>(
        &self,
        ch: &C,
        vault_market_value: Decimal,
    ) -> Result<bool, RangeError> {
        let sqrt_price = self.twap_sqrt_price(ch)?;
        let price = price_from_sqrt(sqrt_price)?;
        let (lower, upper) = widened_band(
            self.state.base_tick_lower,
            self.state.base_tick_upper,
            self.config.params.rebalance_price_threshold_bps,
        )?;
        if price >= lower && price <= upper {
            return Ok(true);
        }
        self.is_reset_at(ch, sqrt_price, vault_market_value)
    }

    /// Move the base range to the current TWAP price.
    ///
    /// The old range is removed and a new one added around the TWAP. The new
    /// range keeps the old liquidity unless there was none or a reset is in
    /// effect, in which case it is sized from `vault_market_value`. A reset
    /// also flattens the net trader position.
    ///
    /// Range state is committed as each range order lands. The reset close
    /// runs after the new range is in place; if it fails the moved range is
    /// kept, the reset stays pending and the error is returned, so either
    /// [`close_token_position_on_reset`](Self::close_token_position_on_reset)
    /// or the next rebalance can finish it.
    pub fn rebalance_ranges<C: ClearingHouse>(
        &mut self,
        ch: &mut C,
        net_trader_position: SignedSize,
        vault_market_value: Decimal,
    ) -> Result<RebalanceResult, RangeError> {
        let sqrt_price = self.twap_sqrt_price(ch)?;
        let is_reset = self.is_reset_at(ch, sqrt_price, vault_market_value)?;

        // 1. plan
        let removal = if self.state.has_range() {
            Some(LiquidityChangeParams {
                tick_lower: self.state.base_tick_lower,
                tick_upper: self.state.base_tick_upper,
                liquidity_delta: -to_i128(self.state.base_liquidity)?,
                close_token_position: false,
            })
        } else {
            None
        };
        let fresh = self.fresh_range(sqrt_price, vault_market_value)?;
        let liquidity = if !self.state.has_range() || is_reset {
            fresh.liquidity
        } else {
            self.state.base_liquidity
        };
        let addition = if liquidity > 0 {
            Some(LiquidityChangeParams {
                tick_lower: fresh.tick_lower,
                tick_upper: fresh.tick_upper,
                liquidity_delta: to_i128(liquidity)?,
                close_token_position: false,
            })
        } else {
            None
        };

        // 2. move the range, removal first, committing each order as it lands
        let mut changes = Vec::with_capacity(2);
        if let Some(change) = removal {
            ch.update_range_order(self.config.account, self.config.pool, &change)?;
            self.state.base_liquidity = 0;
            self.emit_range_change(&change);
            changes.push(change);
        }
        if let Some(change) = addition {
            ch.update_range_order(self.config.account, self.config.pool, &change)?;
            self.emit_range_change(&change);
            changes.push(change);
        }
        self.state.base_tick_lower = fresh.tick_lower;
        self.state.base_tick_upper = fresh.tick_upper;
        self.state.base_liquidity = liquidity;
        self.state.is_reset = is_reset;
        self.emit_event(EventPayload::Rebalanced(RebalancedEvent {
            tick_lower: fresh.tick_lower,
            tick_upper: fresh.tick_upper,
            liquidity,
            is_reset,
        }));

        // 3. reset close
        let close = if is_reset {
            let outcome = match self.close_position(ch, sqrt_price, net_trader_position) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(error = %err, "reset close failed, reset left pending");
                    return Err(err);
                }
            };
            if outcome.reset_cleared {
                self.state.is_reset = false;
            }
            self.emit_close(&outcome);
            Some(outcome)
        } else {
            None
        };

        Ok(RebalanceResult {
            changes,
            range: self.state,
            is_reset,
            close,
        })
    }

    /// Flatten the net trader position while a reset is in progress.
    ///
    /// Positions worth more than `min_notional_position_to_close_threshold`
    /// are traded away inside a TWAP slippage band, partial fills accepted.
    /// The reset clears only when the fill matches the request exactly.
    /// Dust positions clear the reset without trading.
    pub fn close_token_position_on_reset<C: ClearingHouse>(
        &mut self,
        ch: &mut C,
        net_trader_position: SignedSize,
    ) -> Result<CloseOutcome, RangeError> {
        if !self.state.is_reset {
            tracing::warn!(position = %net_trader_position, "close requested without reset");
            return Err(RangeError::InvalidCloseRequest);
        }
        let sqrt_price = self.twap_sqrt_price(ch)?;
        let outcome = self.close_position(ch, sqrt_price, net_trader_position)?;

        if outcome.reset_cleared {
            self.state.is_reset = false;
        }
        self.emit_close(&outcome);
        Ok(outcome)
    }

    fn is_reset_at<C: ClearingHouse>(
        &self,
        ch: &C,
        sqrt_price: Decimal,
        vault_market_value: Decimal,
    ) -> Result<bool, RangeError> {
        let position = ch.net_token_position(self.config.account, self.config.pool)?;
        let notional = token_notional(position, sqrt_price)?;
        let threshold = vault_market_value.abs() * self.config.params.reset_position_threshold_bps.as_fraction();
        Ok(notional > threshold)
    }

    // venue call only, caller commits
    fn close_position<C: ClearingHouse>(
        &self,
        ch: &mut C,
        sqrt_price: Decimal,
        net_trader_position: SignedSize,
    ) -> Result<CloseOutcome, RangeError> {
        let requested = net_trader_position.negate();
        let notional = token_notional(requested, sqrt_price)?;
        let params = &self.config.params;

        if notional <= params.min_notional_position_to_close_threshold {
            tracing::debug!(%notional, "reset close below threshold, skipping trade");
            return Ok(CloseOutcome {
                requested,
                traded: SignedSize::zero(),
                notional,
                swapped: false,
                reset_cleared: true,
            });
        }

        let swap = SwapParams {
            amount: requested.value(),
            sqrt_price_limit: Some(sqrt_price_limit(
                sqrt_price,
                requested.value(),
                params.close_position_slippage_sqrt_tolerance_bps,
            )),
            is_partial_allowed: true,
        };
        let result = ch.swap_token(self.config.account, self.config.pool, &swap)?;
        let traded = SignedSize::new(result.token_amount);
        tracing::debug!(
            buy = requested.is_long(),
            %requested,
            %traded,
            limit = ?swap.sqrt_price_limit,
            "reset close traded"
        );

        Ok(CloseOutcome {
            requested,
            traded,
            notional,
            swapped: true,
            reset_cleared: traded == requested,
        })
    }

    fn emit_range_change(&mut self, change: &LiquidityChangeParams) {
        self.emit_event(EventPayload::RangeOrderUpdated(RangeOrderUpdatedEvent {
            tick_lower: change.tick_lower,
            tick_upper: change.tick_upper,
            liquidity_delta: change.liquidity_delta,
            close_token_position: change.close_token_position,
        }));
    }

    fn emit_close(&mut self, outcome: &CloseOutcome) {
        self.emit_event(EventPayload::TokenPositionClosed(TokenPositionClosedEvent {
            requested: outcome.requested,
            traded: outcome.traded,
            notional: outcome.notional,
            reset_cleared: outcome.reset_cleared,
        }));
    }
}

#[cfg(test)]
mod tests {
    use crate::clearing_house::{
        ClearingHouse, ClearingHouseCall, LiquidityChangeParams, MockClearingHouse, SwapParams, SwapResult,
    };
    use crate::events::EventPayload;
    use crate::math::to_i128;
    use crate::range::{RangeError, RangeStrategy, RangeStrategyConfig};
    use crate::types::{AccountId, PoolId, Price, SignedSize};
    use crate::venue::{FixedAssetPrice, VenueError};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn funded() -> (RangeStrategy, MockClearingHouse) {
        let mut strategy = RangeStrategy::new(RangeStrategyConfig::default()).unwrap();
        let mut ch = MockClearingHouse::new(dec!(40));
        let pricer = FixedAssetPrice(Price::new_unchecked(dec!(1)));
        strategy.after_deposit_ranges(&mut ch, &pricer, dec!(10000), dec!(10000)).unwrap();
        ch.clear_calls();
        (strategy, ch)
    }

    #[test]
    fn reset_detection_uses_twap_notional() {
        let (strategy, mut ch) = funded();
        let account = strategy.account();

        // 20% of 10000 = 2000. one token at 1600 is below, two are above
        ch.set_net_position(account, dec!(-1));
        assert!(!strategy.check_is_reset(&ch, dec!(10000)).unwrap());
        ch.set_net_position(account, dec!(-2));
        assert!(strategy.check_is_reset(&ch, dec!(10000)).unwrap());
        // negative vault value is measured by magnitude
        assert!(strategy.check_is_reset(&ch, dec!(-10000)).unwrap());
    }

    #[test]
    fn valid_range_inside_band_or_on_reset() {
        let (strategy, mut ch) = funded();
        assert!(strategy.is_valid_rebalance_range(&ch, dec!(10000)).unwrap());

        // price 100, far below the range opened at 1600
        ch.set_sqrt_price(dec!(10));
        assert!(!strategy.is_valid_rebalance_range(&ch, dec!(10000)).unwrap());

        ch.set_net_position(strategy.account(), dec!(50)); // 5000 notional
        assert!(strategy.is_valid_rebalance_range(&ch, dec!(10000)).unwrap());
    }

    #[test]
    fn rebalance_carries_liquidity_forward() {
        let (mut strategy, mut ch) = funded();
        let old = strategy.range_state();
        ch.set_sqrt_price(dec!(44));

        let result = strategy.rebalance_ranges(&mut ch, SignedSize::zero(), dec!(20000)).unwrap();
        assert!(!result.is_reset);
        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.changes[0].liquidity_delta, -625);
        assert_eq!(result.changes[1].liquidity_delta, 625);
        assert!(result.range.base_tick_lower > old.base_tick_lower);
        assert_eq!(result.range.base_liquidity, 625);
        assert!(result.close.is_none());
        assert!(matches!(ch.calls()[0], ClearingHouseCall::UpdateRangeOrder(p) if p.liquidity_delta < 0));
    }

    #[test]
    fn rebalance_without_range_only_adds() {
        let mut strategy = RangeStrategy::new(RangeStrategyConfig::default()).unwrap();
        let mut ch = MockClearingHouse::new(dec!(40));

        let result = strategy.rebalance_ranges(&mut ch, SignedSize::zero(), dec!(10000)).unwrap();
        assert!(!result.is_reset);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].liquidity_delta, 625);
        assert_eq!(ch.calls().len(), 1);
    }

    #[test]
    fn rebalance_on_reset_resizes_and_closes() {
        let (mut strategy, mut ch) = funded();
        let account = strategy.account();
        ch.set_net_position(account, dec!(3)); // 4800 notional

        let result = strategy.rebalance_ranges(&mut ch, SignedSize::new(dec!(3)), dec!(5000)).unwrap();
        assert!(result.is_reset);
        // fresh sizing off 5000 replaces the carried 625
        assert_eq!(result.range.base_liquidity, 312);

        let close = result.close.unwrap();
        assert_eq!(close.requested.value(), dec!(-3));
        assert!(close.swapped);
        assert!(close.reset_cleared);
        assert!(!strategy.is_reset());
        assert!(ch.net_token_position(account, strategy.pool()).unwrap().is_zero());

        // removal, addition, then the close trade
        assert!(matches!(ch.calls()[2], ClearingHouseCall::Swap(p) if p.is_partial_allowed));
    }

    #[test]
    fn close_requires_reset() {
        let (mut strategy, mut ch) = funded();
        assert_eq!(
            strategy.close_token_position_on_reset(&mut ch, SignedSize::new(dec!(1))),
            Err(RangeError::InvalidCloseRequest)
        );
        assert!(ch.calls().is_empty());
    }

    #[test]
    fn dust_close_clears_without_trading() {
        let (mut strategy, mut ch) = funded();
        strategy.state.is_reset = true;

        // 0.005 * 1600 = 8, under the default threshold of 10
        let outcome = strategy
            .close_token_position_on_reset(&mut ch, SignedSize::new(dec!(0.005)))
            .unwrap();
        assert!(!outcome.swapped);
        assert!(outcome.reset_cleared);
        assert!(!strategy.is_reset());
        assert!(ch.calls().is_empty());
        assert!(matches!(
            strategy.events().last().unwrap().payload,
            EventPayload::TokenPositionClosed(_)
        ));
    }

    #[test]
    fn close_trade_is_slippage_bounded() {
        let (mut strategy, mut ch) = funded();
        strategy.state.is_reset = true;

        strategy
            .close_token_position_on_reset(&mut ch, SignedSize::new(dec!(-2)))
            .unwrap();
        match &ch.calls()[0] {
            ClearingHouseCall::Swap(params) => {
                assert_eq!(params.amount, dec!(2));
                // buying, so the bound sits 1% above TWAP sqrt
                assert_eq!(params.sqrt_price_limit, Some(dec!(40.4)));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    // a partial fill leaves the reset set. nothing retries the remainder
    // except the next rebalance or an explicit close
    #[test]
    fn partial_fill_keeps_reset_active() {
        let (mut strategy, mut ch) = funded();
        strategy.state.is_reset = true;
        ch.fill_ratio = dec!(0.5);
        ch.set_net_position(strategy.account(), dec!(4));

        let outcome = strategy
            .close_token_position_on_reset(&mut ch, SignedSize::new(dec!(4)))
            .unwrap();
        assert_eq!(outcome.traded.value(), dec!(-2));
        assert!(!outcome.reset_cleared);
        assert!(strategy.is_reset());

        // notional still shrank
        let left = ch.net_token_position(strategy.account(), strategy.pool()).unwrap();
        assert_eq!(left.value(), dec!(2));
    }

    #[test]
    fn failed_close_keeps_moved_range_and_reset() {
        let (mut strategy, mut ch) = funded();
        let account = strategy.account();
        let old = strategy.range_state();
        ch.set_net_position(account, dec!(5));
        ch.fail_swap = true;

        let result = strategy.rebalance_ranges(&mut ch, SignedSize::new(dec!(5)), dec!(10000));
        assert!(matches!(result, Err(RangeError::Venue(_))));

        // the range orders landed, so the state follows them
        let moved = strategy.range_state();
        assert!(moved.is_reset);
        assert_eq!(moved.base_liquidity, 625);
        assert_eq!(ch.range_liquidity(account, old.base_tick_lower, old.base_tick_upper), 0);
        assert_eq!(ch.range_liquidity(account, moved.base_tick_lower, moved.base_tick_upper), 625);
        assert!(matches!(
            strategy.events().last().unwrap().payload,
            EventPayload::Rebalanced(ref r) if r.is_reset
        ));

        // the close can be retried on its own
        ch.fail_swap = false;
        let position = ch.net_token_position(account, strategy.pool()).unwrap();
        let outcome = strategy.close_token_position_on_reset(&mut ch, position).unwrap();
        assert!(outcome.reset_cleared);
        assert!(!strategy.is_reset());
    }

    #[test]
    fn rebalance_retry_after_failed_close_at_new_price() {
        let (mut strategy, mut ch) = funded();
        let account = strategy.account();
        ch.set_net_position(account, dec!(5));
        ch.fail_swap = true;
        ch.set_sqrt_price(dec!(44));
        assert!(strategy.rebalance_ranges(&mut ch, SignedSize::new(dec!(5)), dec!(10000)).is_err());
        let first = strategy.range_state();

        ch.fail_swap = false;
        ch.set_sqrt_price(dec!(46));
        let result = strategy
            .rebalance_ranges(&mut ch, SignedSize::new(dec!(5)), dec!(10000))
            .unwrap();

        // the retry removes the range the failed call left behind
        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.changes[0].tick_lower, first.base_tick_lower);
        assert_eq!(-result.changes[0].liquidity_delta, to_i128(first.base_liquidity).unwrap());
        assert_eq!(ch.range_liquidity(account, first.base_tick_lower, first.base_tick_upper), 0);
        assert!(result.close.unwrap().reset_cleared);
        assert!(!strategy.is_reset());
        assert!(ch.net_token_position(account, strategy.pool()).unwrap().is_zero());

        // later withdraws see consistent ticks
        let pricer = FixedAssetPrice(Price::new_unchecked(dec!(1)));
        strategy.before_withdraw_ranges(&mut ch, &pricer, dec!(10000), dec!(10000)).unwrap();
        assert!(!strategy.range_state().has_range());
    }

    #[test]
    fn failed_addition_books_the_removal() {
        let (mut strategy, mut ch) = funded();
        let account = strategy.account();
        let old = strategy.range_state();
        ch.set_sqrt_price(dec!(44));

        struct RejectAdds(MockClearingHouse);
        impl ClearingHouse for RejectAdds {
            fn twap_duration(&self, pool: PoolId) -> Result<u32, VenueError> {
                self.0.twap_duration(pool)
            }
            fn twap_sqrt_price(&self, pool: PoolId, duration: u32) -> Result<Decimal, VenueError> {
                self.0.twap_sqrt_price(pool, duration)
            }
            fn net_token_position(&self, account: AccountId, pool: PoolId) -> Result<SignedSize, VenueError> {
                self.0.net_token_position(account, pool)
            }
            fn update_range_order(
                &mut self,
                account: AccountId,
                pool: PoolId,
                params: &LiquidityChangeParams,
            ) -> Result<(), VenueError> {
                if params.liquidity_delta > 0 {
                    return Err(VenueError::Rejected("no adds".to_string()));
                }
                self.0.update_range_order(account, pool, params)
            }
            fn swap_token(&mut self, account: AccountId, pool: PoolId, params: &SwapParams) -> Result<SwapResult, VenueError> {
                self.0.swap_token(account, pool, params)
            }
            fn simulate_swap(&self, pool: PoolId, params: &SwapParams) -> Result<SwapResult, VenueError> {
                self.0.simulate_swap(pool, params)
            }
            fn update_margin(&mut self, account: AccountId, collateral_delta: Decimal) -> Result<(), VenueError> {
                self.0.update_margin(account, collateral_delta)
            }
        }

        let mut rejecting = RejectAdds(ch);
        assert!(strategy
            .rebalance_ranges(&mut rejecting, SignedSize::zero(), dec!(10000))
            .is_err());
        assert!(!strategy.range_state().has_range());
        assert_eq!(rejecting.0.range_liquidity(account, old.base_tick_lower, old.base_tick_upper), 0);

        // with no range booked the next rebalance only adds
        let mut ch = rejecting.0;
        let result = strategy.rebalance_ranges(&mut ch, SignedSize::zero(), dec!(10000)).unwrap();
        assert_eq!(result.changes.len(), 1);
        assert!(result.changes[0].liquidity_delta > 0);
    }
}
