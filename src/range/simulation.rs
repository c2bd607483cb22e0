//! Previews for the vault controller. Nothing here mutates the strategy or the ledger.

use super::core::RangeStrategy;
use super::results::{RangeError, WithdrawSimulation};
use crate::clearing_house::{ClearingHouse, LiquidityChangeParams, SwapParams};
use crate::math::{price_from_sqrt, MathError};
use crate::venue::AssetPricer;
use rust_decimal::Decimal;

impl RangeStrategy {
    /// The liquidity change `after_deposit_ranges` would submit.
    pub fn simulate_after_deposit<C: ClearingHouse, P: AssetPricer>(
        &self,
        ch: &C,
        pricer: &P,
        amount_after_deposit: Decimal,
        amount_deposited: Decimal,
    ) -> Result<LiquidityChangeParams, RangeError> {
        Ok(self.plan_deposit(ch, pricer, amount_after_deposit, amount_deposited)?.change)
    }

    /// Preview a withdrawal of `amount_withdrawn` out of `amount_before_withdraw`.
    ///
    /// The withdrawn share of the net token position has to be traded away.
    /// That trade is quoted on the venue, and whatever it costs beyond its
    /// TWAP value is taken off the withdrawn amount, in asset units.
    pub fn simulate_before_withdraw<C: ClearingHouse, P: AssetPricer>(
        &self,
        ch: &C,
        pricer: &P,
        amount_before_withdraw: Decimal,
        amount_withdrawn: Decimal,
    ) -> Result<WithdrawSimulation, RangeError> {
        let plan = self.plan_withdraw(pricer, amount_before_withdraw, amount_withdrawn)?;

        let position = ch.net_token_position(self.config.account, self.config.pool)?;
        let tokens_to_trade = -(position.value() * amount_withdrawn / amount_before_withdraw);

        let mut adjusted = amount_withdrawn;
        if !tokens_to_trade.is_zero() {
            let quote = ch.simulate_swap(
                self.config.pool,
                &SwapParams {
                    amount: tokens_to_trade,
                    sqrt_price_limit: None,
                    is_partial_allowed: false,
                },
            )?;
            let twap_price = price_from_sqrt(self.twap_sqrt_price(ch)?)?;
            let twap_quote = -tokens_to_trade * twap_price;
            let shortfall = (twap_quote - quote.quote_amount).max(Decimal::ZERO);

            let asset_price = pricer.asset_price()?.value();
            let shortfall_in_asset = shortfall.checked_div(asset_price).ok_or(MathError::DivisionByZero)?;
            adjusted = (amount_withdrawn - shortfall_in_asset).max(Decimal::ZERO);
        }

        Ok(WithdrawSimulation {
            adjusted_amount_withdrawn: adjusted,
            tokens_to_trade,
            liquidity_delta: plan.change.liquidity_delta,
        })
    }
}
