//! Read-only views. Balances are settled on read, nothing is written back.

use super::core::BatchingManager;
use super::results::BatchingError;
use crate::account::{RoundAccount, RoundRecord};
use crate::math::MathError;
use crate::types::{AccountId, RoundId, VaultId};

impl BatchingManager {
    pub fn current_round(&self, vault_id: VaultId) -> Result<RoundId, BatchingError> {
        Ok(self.vault(vault_id)?.current_round)
    }

    pub fn round_pending_total(&self, vault_id: VaultId) -> Result<u128, BatchingError> {
        Ok(self.vault(vault_id)?.round_pending_total)
    }

    pub fn vault_staked_balance(&self, vault_id: VaultId) -> Result<u128, BatchingError> {
        Ok(self.vault(vault_id)?.vault_staked_balance)
    }

    pub fn round_record(&self, vault_id: VaultId, round: RoundId) -> Result<Option<RoundRecord>, BatchingError> {
        Ok(self.vault(vault_id)?.round_record(round).copied())
    }

    /// The user's account as the next mutating call would see it.
    pub fn user_account(&self, vault_id: VaultId, user: AccountId) -> Result<RoundAccount, BatchingError> {
        Ok(self.vault(vault_id)?.settled_account(user)?)
    }

    /// Staked asset still waiting in the open round.
    pub fn staked_balance(&self, vault_id: VaultId, user: AccountId) -> Result<u128, BatchingError> {
        Ok(self.user_account(vault_id, user)?.pending_balance)
    }

    pub fn unclaimed_shares(&self, vault_id: VaultId, user: AccountId) -> Result<u128, BatchingError> {
        Ok(self.user_account(vault_id, user)?.unclaimed_shares)
    }

    pub fn staked_balance_all_vaults(&self, user: AccountId) -> Result<u128, BatchingError> {
        self.sum_over_vaults(user, |account| account.pending_balance)
    }

    pub fn unclaimed_shares_all_vaults(&self, user: AccountId) -> Result<u128, BatchingError> {
        self.sum_over_vaults(user, |account| account.unclaimed_shares)
    }

    fn sum_over_vaults(&self, user: AccountId, field: impl Fn(&RoundAccount) -> u128) -> Result<u128, BatchingError> {
        let mut total: u128 = 0;
        for state in &self.vaults {
            let account = state.settled_account(user)?;
            total = total.checked_add(field(&account)).ok_or(MathError::Overflow)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use crate::batching::{BatchingConfig, BatchingError, BatchingManager};
    use crate::staking::MockStakingVenue;
    use crate::types::{AccountId, RoundId, TokenId, VaultId};

    const USDC: TokenId = TokenId(1);
    const ALICE: AccountId = AccountId(1);

    #[test]
    fn queries_settle_on_read() {
        let mut mgr = BatchingManager::new(BatchingConfig::default()).unwrap();
        let owner = mgr.owner();
        let keeper = mgr.keeper();
        let vault = mgr.register_vault(owner, AccountId(900)).unwrap();
        let mut venue = MockStakingVenue::new(mgr.address());
        venue.fund(USDC, ALICE, 1_000);

        mgr.deposit_token(&mut venue, ALICE, vault, USDC, 100, 0, ALICE).unwrap();
        assert_eq!(mgr.staked_balance(vault, ALICE).unwrap(), 100);
        assert_eq!(mgr.round_pending_total(vault).unwrap(), 100);

        mgr.execute_batch_deposit(&mut venue, keeper, vault).unwrap();
        assert_eq!(mgr.current_round(vault).unwrap(), RoundId(2));
        assert_eq!(mgr.staked_balance(vault, ALICE).unwrap(), 0);
        assert_eq!(mgr.unclaimed_shares(vault, ALICE).unwrap(), 100);
        assert_eq!(mgr.round_record(vault, RoundId(1)).unwrap().unwrap().total_shares, 100);
        assert_eq!(mgr.round_record(vault, RoundId(2)).unwrap(), None);

        // the stored account is still the unsettled one
        assert_eq!(mgr.vault(vault).unwrap().account(ALICE).pending_balance, 100);
    }

    #[test]
    fn totals_across_vaults() {
        let mut mgr = BatchingManager::new(BatchingConfig::default()).unwrap();
        let owner = mgr.owner();
        let keeper = mgr.keeper();
        let a = mgr.register_vault(owner, AccountId(900)).unwrap();
        let b = mgr.register_vault(owner, AccountId(901)).unwrap();
        let mut venue = MockStakingVenue::new(mgr.address());
        venue.fund(USDC, ALICE, 1_000);

        mgr.deposit_token(&mut venue, ALICE, a, USDC, 70, 0, ALICE).unwrap();
        mgr.deposit_token(&mut venue, ALICE, b, USDC, 30, 0, ALICE).unwrap();
        mgr.execute_batch_deposit(&mut venue, keeper, a).unwrap();

        assert_eq!(mgr.staked_balance_all_vaults(ALICE).unwrap(), 30);
        assert_eq!(mgr.unclaimed_shares_all_vaults(ALICE).unwrap(), 70);
        assert_eq!(mgr.vault_staked_balance(a).unwrap(), 0);
    }

    #[test]
    fn unknown_vault_query() {
        let mgr = BatchingManager::new(BatchingConfig::default()).unwrap();
        assert_eq!(
            mgr.current_round(VaultId(9)),
            Err(BatchingError::VaultNotFound(VaultId(9)))
        );
    }
}
