//! Per-vault batching ledger.
//!
//! Each pooled vault owns its own round counter, the running total of the
//! open round, the harvested-reward balance and two keyed maps: user round
//! accounts and settled round records. Nothing here talks to a venue; the
//! batching manager computes new values with these helpers and commits them
//! only after every external call for the operation has succeeded.

use crate::math::{mul_div_floor, MathError};
use crate::types::{AccountId, RoundId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A user's deposit and claim bookkeeping inside one pooled vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundAccount {
    pub last_round: RoundId,
    pub pending_balance: u128,
    pub unclaimed_shares: u128,
}

impl RoundAccount {
    pub fn is_empty(&self) -> bool {
        self.pending_balance == 0 && self.unclaimed_shares == 0
    }

    /// Converts a pending balance from an already executed round into shares.
    /// Returns the account unchanged when there is nothing stale to settle.
    pub fn settled(
        &self,
        current_round: RoundId,
        rounds: &HashMap<RoundId, RoundRecord>,
    ) -> Result<RoundAccount, MathError> {
        if self.last_round >= current_round || self.pending_balance == 0 {
            return Ok(*self);
        }
        let Some(record) = rounds.get(&self.last_round) else {
            // rounds only advance by writing their record first
            debug_assert!(false, "missing record for round {}", self.last_round);
            return Ok(*self);
        };

        let shares = record.shares_for(self.pending_balance)?;
        Ok(RoundAccount {
            last_round: self.last_round,
            pending_balance: 0,
            unclaimed_shares: self
                .unclaimed_shares
                .checked_add(shares)
                .ok_or(MathError::Overflow)?,
        })
    }
}

/// Result of one executed round. Written once, never modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub total_staked: u128,
    pub total_shares: u128,
}

impl RoundRecord {
    // floors, so the sum over a round never exceeds total_shares
    pub fn shares_for(&self, staked: u128) -> Result<u128, MathError> {
        mul_div_floor(staked, self.total_shares, self.total_staked)
    }
}

/// Batching state for one registered vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultBatchState {
    pub address: AccountId,
    pub current_round: RoundId,
    pub round_pending_total: u128,
    // harvested rewards waiting to be pushed to the vault without shares
    pub vault_staked_balance: u128,
    accounts: HashMap<AccountId, RoundAccount>,
    rounds: HashMap<RoundId, RoundRecord>,
}

impl VaultBatchState {
    pub fn new(address: AccountId) -> Self {
        Self {
            address,
            current_round: RoundId::FIRST,
            round_pending_total: 0,
            vault_staked_balance: 0,
            accounts: HashMap::new(),
            rounds: HashMap::new(),
        }
    }

    pub fn account(&self, user: AccountId) -> RoundAccount {
        self.accounts.get(&user).copied().unwrap_or_default()
    }

    /// The account as it would look after settling any stale round.
    pub fn settled_account(&self, user: AccountId) -> Result<RoundAccount, MathError> {
        self.account(user).settled(self.current_round, &self.rounds)
    }

    pub fn round_record(&self, round: RoundId) -> Option<&RoundRecord> {
        self.rounds.get(&round)
    }

    pub fn has_pending_work(&self) -> bool {
        self.round_pending_total > 0 || self.vault_staked_balance > 0
    }

    pub fn accounts_iter(&self) -> impl Iterator<Item = (&AccountId, &RoundAccount)> {
        self.accounts.iter()
    }

    pub(crate) fn put_account(&mut self, user: AccountId, account: RoundAccount) {
        if account.is_empty() {
            self.accounts.remove(&user);
        } else {
            self.accounts.insert(user, account);
        }
    }

    // closes the open round with the venue's answer and opens the next one
    pub(crate) fn close_round(&mut self, total_shares: u128) -> RoundRecord {
        let record = RoundRecord {
            total_staked: self.round_pending_total,
            total_shares,
        };
        self.rounds.insert(self.current_round, record);
        self.round_pending_total = 0;
        self.current_round = self.current_round.next();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(round: u64, balance: u128) -> RoundAccount {
        RoundAccount {
            last_round: RoundId(round),
            pending_balance: balance,
            unclaimed_shares: 0,
        }
    }

    #[test]
    fn settles_stale_round_with_recorded_ratio() {
        let mut rounds = HashMap::new();
        rounds.insert(
            RoundId(1),
            RoundRecord {
                total_staked: 200,
                total_shares: 100,
            },
        );

        let settled = pending(1, 60).settled(RoundId(2), &rounds).unwrap();
        assert_eq!(settled.pending_balance, 0);
        assert_eq!(settled.unclaimed_shares, 30);
    }

    #[test]
    fn current_round_is_not_settled() {
        let rounds = HashMap::new();
        let account = pending(3, 60);
        assert_eq!(account.settled(RoundId(3), &rounds).unwrap(), account);
    }

    #[test]
    fn settling_twice_is_a_no_op() {
        let mut rounds = HashMap::new();
        rounds.insert(
            RoundId(1),
            RoundRecord {
                total_staked: 3,
                total_shares: 10,
            },
        );

        let once = pending(1, 1).settled(RoundId(2), &rounds).unwrap();
        let twice = once.settled(RoundId(2), &rounds).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.unclaimed_shares, 3); // floor(10 / 3)
    }

    #[test]
    fn close_round_advances_and_resets_total() {
        let mut state = VaultBatchState::new(AccountId(500));
        state.round_pending_total = 100;

        let record = state.close_round(90);
        assert_eq!(record.total_staked, 100);
        assert_eq!(record.total_shares, 90);
        assert_eq!(state.current_round, RoundId(2));
        assert_eq!(state.round_pending_total, 0);
        assert_eq!(state.round_record(RoundId(1)), Some(&record));
    }

    #[test]
    fn empty_accounts_are_pruned() {
        let mut state = VaultBatchState::new(AccountId(500));
        state.put_account(AccountId(1), pending(1, 10));
        assert_eq!(state.accounts_iter().count(), 1);

        state.put_account(AccountId(1), RoundAccount::default());
        assert_eq!(state.accounts_iter().count(), 0);
        assert_eq!(state.account(AccountId(1)), RoundAccount::default());
    }
}
