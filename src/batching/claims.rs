//! Share claims. Never paused.

use super::core::BatchingManager;
use super::results::BatchingError;
use crate::events::{EventPayload, SharesClaimedEvent};
use crate::staking::StakingVenue;
use crate::types::{AccountId, VaultId};

impl BatchingManager {
    /// Transfer `amount` of the caller's vault shares to `receiver`.
    ///
    /// Any pending balance from an executed round is converted first, so a
    /// user can claim in the same call that would settle their last round.
    pub fn claim<V: StakingVenue>(
        &mut self,
        venue: &mut V,
        caller: AccountId,
        vault_id: VaultId,
        receiver: AccountId,
        amount: u128,
    ) -> Result<(), BatchingError> {
        if receiver.is_null() {
            return Err(BatchingError::InvalidInput("receiver"));
        }
        if amount == 0 {
            return Err(BatchingError::InvalidInput("amount"));
        }

        let state = self.vault(vault_id)?;
        let vault_address = state.address;
        let mut account = state.settled_account(caller)?;

        if account.unclaimed_shares < amount {
            tracing::warn!(
                %caller,
                requested = amount,
                available = account.unclaimed_shares,
                "claim exceeds unclaimed shares"
            );
            return Err(BatchingError::InsufficientShares {
                available: account.unclaimed_shares,
            });
        }
        account.unclaimed_shares -= amount;

        venue.transfer_shares(vault_address, receiver, amount)?;

        self.vault_mut(vault_id)?.put_account(caller, account);
        self.emit_event(EventPayload::SharesClaimed(SharesClaimedEvent {
            vault_id,
            from: caller,
            receiver,
            amount,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::batching::{BatchingConfig, BatchingError, BatchingManager};
    use crate::staking::MockStakingVenue;
    use crate::types::{AccountId, RoundId, TokenId, VaultId};

    const VAULT: AccountId = AccountId(900);
    const USDC: TokenId = TokenId(1);
    const ALICE: AccountId = AccountId(1);
    const CAROL: AccountId = AccountId(3);

    // alice deposits 100 in round 1, batch mints 100 shares
    fn settled_round() -> (BatchingManager, MockStakingVenue, VaultId) {
        let mut mgr = BatchingManager::new(BatchingConfig::default()).unwrap();
        let owner = mgr.owner();
        let keeper = mgr.keeper();
        let vault_id = mgr.register_vault(owner, VAULT).unwrap();
        let mut venue = MockStakingVenue::new(mgr.address());
        venue.fund(USDC, ALICE, 1_000);

        mgr.deposit_token(&mut venue, ALICE, vault_id, USDC, 100, 0, ALICE).unwrap();
        mgr.execute_batch_deposit(&mut venue, keeper, vault_id).unwrap();
        (mgr, venue, vault_id)
    }

    #[test]
    fn claim_all_leaves_empty_account() {
        let (mut mgr, mut venue, vault_id) = settled_round();

        mgr.claim(&mut venue, ALICE, vault_id, ALICE, 100).unwrap();
        assert_eq!(venue.share_balance(VAULT, ALICE), 100);

        let account = mgr.vault(vault_id).unwrap().settled_account(ALICE).unwrap();
        assert_eq!(account.pending_balance, 0);
        assert_eq!(account.unclaimed_shares, 0);
    }

    #[test]
    fn partial_claim_to_other_receiver() {
        let (mut mgr, mut venue, vault_id) = settled_round();

        mgr.claim(&mut venue, ALICE, vault_id, CAROL, 30).unwrap();
        assert_eq!(venue.share_balance(VAULT, CAROL), 30);

        let account = mgr.vault(vault_id).unwrap().account(ALICE);
        assert_eq!(account.unclaimed_shares, 70);
        assert_eq!(account.last_round, RoundId(1));
    }

    #[test]
    fn over_claim_reports_available() {
        let (mut mgr, mut venue, vault_id) = settled_round();

        assert_eq!(
            mgr.claim(&mut venue, ALICE, vault_id, ALICE, 101),
            Err(BatchingError::InsufficientShares { available: 100 })
        );
        assert_eq!(venue.share_balance(VAULT, ALICE), 0);
        // the stale pending balance was only settled in a scratch copy
        assert_eq!(mgr.vault(vault_id).unwrap().account(ALICE).pending_balance, 100);
    }

    #[test]
    fn claim_validation() {
        let (mut mgr, mut venue, vault_id) = settled_round();
        assert_eq!(
            mgr.claim(&mut venue, ALICE, vault_id, AccountId::NULL, 1),
            Err(BatchingError::InvalidInput("receiver"))
        );
        assert_eq!(
            mgr.claim(&mut venue, ALICE, vault_id, ALICE, 0),
            Err(BatchingError::InvalidInput("amount"))
        );
    }

    #[test]
    fn claims_work_while_paused() {
        let (mut mgr, mut venue, vault_id) = settled_round();
        let keeper = mgr.keeper();
        mgr.pause_deposit(keeper).unwrap();

        mgr.claim(&mut venue, ALICE, vault_id, ALICE, 10).unwrap();
        assert_eq!(venue.share_balance(VAULT, ALICE), 10);
    }

    #[test]
    fn failed_transfer_keeps_shares() {
        let (mut mgr, mut venue, vault_id) = settled_round();
        venue.fail_transfer = true;

        assert!(matches!(
            mgr.claim(&mut venue, ALICE, vault_id, ALICE, 10),
            Err(BatchingError::Venue(_))
        ));
        let account = mgr.vault(vault_id).unwrap().settled_account(ALICE).unwrap();
        assert_eq!(account.unclaimed_shares, 100);
    }
}
