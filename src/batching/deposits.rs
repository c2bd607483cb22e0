//! Deposit intake. Tokens are staked on the way in and credited to the open round.

use super::core::BatchingManager;
use super::results::BatchingError;
use crate::account::RoundAccount;
use crate::events::{DepositEvent, EventPayload};
use crate::math::MathError;
use crate::staking::StakingVenue;
use crate::types::{AccountId, RoundId, TokenId, VaultId};

// where a credited amount ends up, computed before anything is committed
enum Credit {
    VaultBalance { new_balance: u128 },
    Round {
        account: RoundAccount,
        new_round_total: u128,
    },
}

impl BatchingManager {
    /// Deposit `amount` of `token` on behalf of `receiver`.
    ///
    /// The token is pulled from `caller` and staked into the intermediate asset.
    /// A failed stake returns the pulled tokens to `caller` before erroring.
    /// When `receiver` is the vault itself the staked amount is parked as a
    /// harvested-reward balance; otherwise it joins the current round.
    /// Returns the staked amount credited.
    #[allow(clippy::too_many_arguments)]
    pub fn deposit_token<V: StakingVenue>(
        &mut self,
        venue: &mut V,
        caller: AccountId,
        vault_id: VaultId,
        token: TokenId,
        amount: u128,
        min_output: u128,
        receiver: AccountId,
    ) -> Result<u128, BatchingError> {
        if token.is_null() {
            return Err(BatchingError::InvalidInput("token"));
        }
        self.check_deposit(vault_id, amount, receiver)?;

        venue.transfer_in(token, caller, amount)?;
        let staked = match venue.stake(token, amount, min_output) {
            Ok(staked) => staked,
            Err(err) => {
                // nothing was credited, hand the pulled tokens back
                tracing::warn!(?vault_id, %caller, amount, error = %err, "stake failed, refunding deposit");
                venue.transfer_out(token, caller, amount)?;
                return Err(err.into());
            }
        };

        let credit = self.plan_credit(vault_id, receiver, staked)?;
        let round = self.apply_credit(vault_id, receiver, credit)?;

        self.emit_event(EventPayload::Deposit(DepositEvent {
            vault_id,
            round,
            token,
            receiver,
            amount,
            staked_amount: staked,
        }));
        Ok(staked)
    }

    /// Deposit already-staked intermediate asset. Same accounting as
    /// [`deposit_token`](Self::deposit_token) without the stake call.
    pub fn deposit_staked<V: StakingVenue>(
        &mut self,
        venue: &mut V,
        caller: AccountId,
        vault_id: VaultId,
        amount: u128,
        receiver: AccountId,
    ) -> Result<(), BatchingError> {
        self.check_deposit(vault_id, amount, receiver)?;
        let credit = self.plan_credit(vault_id, receiver, amount)?;

        venue.transfer_staked_in(caller, amount)?;

        let round = self.apply_credit(vault_id, receiver, credit)?;

        self.emit_event(EventPayload::Deposit(DepositEvent {
            vault_id,
            round,
            token: TokenId::NULL,
            receiver,
            amount,
            staked_amount: amount,
        }));
        Ok(())
    }

    fn check_deposit(&self, vault_id: VaultId, amount: u128, receiver: AccountId) -> Result<(), BatchingError> {
        if amount == 0 {
            return Err(BatchingError::InvalidInput("amount"));
        }
        if receiver.is_null() {
            return Err(BatchingError::InvalidInput("receiver"));
        }
        if self.paused {
            tracing::warn!(?vault_id, %receiver, amount, "deposit rejected while paused");
            return Err(BatchingError::Paused);
        }
        self.vault(vault_id)?;
        Ok(())
    }

    fn plan_credit(&self, vault_id: VaultId, receiver: AccountId, staked: u128) -> Result<Credit, BatchingError> {
        let state = self.vault(vault_id)?;

        if receiver == state.address {
            let new_balance = state
                .vault_staked_balance
                .checked_add(staked)
                .ok_or(MathError::Overflow)?;
            return Ok(Credit::VaultBalance { new_balance });
        }

        // stale pending from an executed round becomes shares before new money lands
        let mut account = state.settled_account(receiver)?;
        account.last_round = state.current_round;
        account.pending_balance = account
            .pending_balance
            .checked_add(staked)
            .ok_or(MathError::Overflow)?;
        let new_round_total = state
            .round_pending_total
            .checked_add(staked)
            .ok_or(MathError::Overflow)?;

        Ok(Credit::Round {
            account,
            new_round_total,
        })
    }

    fn apply_credit(&mut self, vault_id: VaultId, receiver: AccountId, credit: Credit) -> Result<RoundId, BatchingError> {
        let state = self.vault_mut(vault_id)?;
        match credit {
            Credit::VaultBalance { new_balance } => {
                state.vault_staked_balance = new_balance;
            }
            Credit::Round {
                account,
                new_round_total,
            } => {
                state.put_account(receiver, account);
                state.round_pending_total = new_round_total;
            }
        }
        Ok(state.current_round)
    }
}

#[cfg(test)]
mod tests {
    use crate::batching::{BatchingConfig, BatchingError, BatchingManager};
    use crate::staking::MockStakingVenue;
    use crate::types::{AccountId, RoundId, TokenId, VaultId};
    use crate::venue::VenueError;

    const VAULT: AccountId = AccountId(900);
    const USDC: TokenId = TokenId(1);
    const ALICE: AccountId = AccountId(1);

    fn setup() -> (BatchingManager, MockStakingVenue, VaultId) {
        let mut mgr = BatchingManager::new(BatchingConfig::default()).unwrap();
        let owner = mgr.owner();
        let vault_id = mgr.register_vault(owner, VAULT).unwrap();
        let mut venue = MockStakingVenue::new(mgr.address());
        venue.fund(USDC, ALICE, 10_000);
        (mgr, venue, vault_id)
    }

    #[test]
    fn deposit_joins_current_round() {
        let (mut mgr, mut venue, vault_id) = setup();

        let staked = mgr
            .deposit_token(&mut venue, ALICE, vault_id, USDC, 100, 0, ALICE)
            .unwrap();
        assert_eq!(staked, 100);

        let state = mgr.vault(vault_id).unwrap();
        assert_eq!(state.round_pending_total, 100);
        let account = state.account(ALICE);
        assert_eq!(account.last_round, RoundId(1));
        assert_eq!(account.pending_balance, 100);
    }

    #[test]
    fn deposit_validation() {
        let (mut mgr, mut venue, vault_id) = setup();

        assert_eq!(
            mgr.deposit_token(&mut venue, ALICE, vault_id, TokenId::NULL, 100, 0, ALICE),
            Err(BatchingError::InvalidInput("token"))
        );
        assert_eq!(
            mgr.deposit_token(&mut venue, ALICE, vault_id, USDC, 0, 0, ALICE),
            Err(BatchingError::InvalidInput("amount"))
        );
        assert_eq!(
            mgr.deposit_token(&mut venue, ALICE, vault_id, USDC, 100, 0, AccountId::NULL),
            Err(BatchingError::InvalidInput("receiver"))
        );
        assert_eq!(venue.token_balance(USDC, ALICE), 10_000);
    }

    #[test]
    fn deposit_to_vault_address_is_harvest() {
        let (mut mgr, mut venue, vault_id) = setup();

        mgr.deposit_token(&mut venue, ALICE, vault_id, USDC, 250, 0, VAULT).unwrap();

        let state = mgr.vault(vault_id).unwrap();
        assert_eq!(state.vault_staked_balance, 250);
        assert_eq!(state.round_pending_total, 0);
        assert_eq!(state.account(VAULT).pending_balance, 0);
    }

    #[test]
    fn failed_stake_leaves_state_untouched() {
        let (mut mgr, mut venue, vault_id) = setup();
        venue.fail_stake = true;

        let result = mgr.deposit_token(&mut venue, ALICE, vault_id, USDC, 100, 0, ALICE);
        assert!(matches!(result, Err(BatchingError::Venue(_))));
        assert_eq!(mgr.vault(vault_id).unwrap().round_pending_total, 0);
        assert!(mgr.events().iter().all(|e| !matches!(e.payload, crate::events::EventPayload::Deposit(_))));
        // pulled tokens went back to the caller
        assert_eq!(venue.token_balance(USDC, ALICE), 10_000);
        assert_eq!(venue.token_balance(USDC, mgr.address()), 0);
    }

    #[test]
    fn slippage_refunds_caller() {
        let (mut mgr, mut venue, vault_id) = setup();

        let result = mgr.deposit_token(&mut venue, ALICE, vault_id, USDC, 100, 101, ALICE);
        assert!(matches!(
            result,
            Err(BatchingError::Venue(VenueError::SlippageExceeded { min_output: 101, actual: 100 }))
        ));
        assert_eq!(venue.token_balance(USDC, ALICE), 10_000);
        assert_eq!(venue.token_balance(USDC, mgr.address()), 0);
        assert_eq!(mgr.vault(vault_id).unwrap().account(ALICE).pending_balance, 0);

        // the refunded tokens can be deposited again
        mgr.deposit_token(&mut venue, ALICE, vault_id, USDC, 100, 100, ALICE).unwrap();
        assert_eq!(venue.token_balance(USDC, ALICE), 9_900);
    }

    #[test]
    fn deposit_staked_skips_stake() {
        let (mut mgr, mut venue, vault_id) = setup();
        venue.fund_staked(ALICE, 40);

        mgr.deposit_staked(&mut venue, ALICE, vault_id, 40, ALICE).unwrap();
        assert_eq!(mgr.vault(vault_id).unwrap().account(ALICE).pending_balance, 40);
        assert_eq!(venue.staked_custody(), 40);

        let result = mgr.deposit_staked(&mut venue, ALICE, vault_id, 1, ALICE);
        assert!(matches!(result, Err(BatchingError::Venue(_))));
    }
}
