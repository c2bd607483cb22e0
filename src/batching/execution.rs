//! Keeper-driven batch execution. One external deposit per vault per round.

use super::core::BatchingManager;
use super::results::{BatchAllResult, BatchResult, BatchingError};
use crate::account::RoundRecord;
use crate::events::{BatchDepositEvent, EventPayload, VaultDirectDepositEvent};
use crate::staking::StakingVenue;
use crate::types::{AccountId, RoundId, VaultId};

// what a vault's batch will move, read before any venue call
#[derive(Debug, Clone, Copy)]
struct BatchPlan {
    vault_id: VaultId,
    address: AccountId,
    direct_deposit: u128,
    round: RoundId,
    round_total: u128,
}

impl BatchingManager {
    /// Push one vault's pending staked asset into the pooled vault.
    ///
    /// Harvested rewards parked on the vault account are transferred without
    /// minting shares. User deposits of the open round are deposited in one
    /// call and the minted shares fix the round's conversion ratio. Each venue
    /// call is committed as soon as it lands, so a failed round deposit still
    /// keeps a harvest transfer that went through. A fully successful
    /// execution lifts a deposit pause.
    pub fn execute_batch_deposit<V: StakingVenue>(
        &mut self,
        venue: &mut V,
        caller: AccountId,
        vault_id: VaultId,
    ) -> Result<BatchResult, BatchingError> {
        self.only_keeper(caller)?;

        let plan = self.plan_batch(vault_id)?.ok_or(BatchingError::NothingToDeposit)?;
        let result = self.run_batch(venue, &plan)?;

        self.lift_pause();
        Ok(result)
    }

    /// Run [`execute_batch_deposit`](Self::execute_batch_deposit) for every
    /// registered vault with pending work.
    ///
    /// Vaults are executed one after another and a failing vault does not stop
    /// the pass: its error is reported in `failed` and it keeps its pending
    /// work for the next run. Fails outright only when no vault had anything
    /// to deposit, or when every vault with work failed.
    pub fn execute_batch_deposit_all<V: StakingVenue>(
        &mut self,
        venue: &mut V,
        caller: AccountId,
    ) -> Result<BatchAllResult, BatchingError> {
        self.only_keeper(caller)?;

        let mut plans = Vec::new();
        for vault_id in self.vault_ids() {
            if let Some(plan) = self.plan_batch(vault_id)? {
                plans.push(plan);
            }
        }
        if plans.is_empty() {
            return Err(BatchingError::NothingToDeposit);
        }

        let mut outcome = BatchAllResult::default();
        for plan in &plans {
            match self.run_batch(venue, plan) {
                Ok(result) => outcome.executed.push(result),
                Err(err) => {
                    tracing::warn!(vault_id = ?plan.vault_id, error = %err, "vault batch failed");
                    outcome.failed.push((plan.vault_id, err));
                }
            }
        }

        if outcome.executed.is_empty() {
            if let Some((_, err)) = outcome.failed.into_iter().next() {
                return Err(err);
            }
            return Err(BatchingError::NothingToDeposit);
        }
        self.lift_pause();
        Ok(outcome)
    }

    fn plan_batch(&self, vault_id: VaultId) -> Result<Option<BatchPlan>, BatchingError> {
        let state = self.vault(vault_id)?;
        if !state.has_pending_work() {
            return Ok(None);
        }
        Ok(Some(BatchPlan {
            vault_id,
            address: state.address,
            direct_deposit: state.vault_staked_balance,
            round: state.current_round,
            round_total: state.round_pending_total,
        }))
    }

    // each venue call is followed by its commit, state never runs ahead of or behind the venue
    fn run_batch<V: StakingVenue>(&mut self, venue: &mut V, plan: &BatchPlan) -> Result<BatchResult, BatchingError> {
        if plan.direct_deposit > 0 {
            venue.transfer_staked(plan.address, plan.direct_deposit)?;
            self.commit_direct(plan)?;
        }

        let closed = if plan.round_total > 0 {
            let shares = venue.deposit(plan.address, plan.round_total, self.address())?;
            Some(self.commit_round(plan, shares)?)
        } else {
            None
        };

        Ok(BatchResult {
            vault_id: plan.vault_id,
            direct_deposit: plan.direct_deposit,
            round: closed.map(|_| plan.round),
            total_staked: closed.map_or(0, |r| r.total_staked),
            total_shares: closed.map_or(0, |r| r.total_shares),
        })
    }

    fn commit_direct(&mut self, plan: &BatchPlan) -> Result<(), BatchingError> {
        let state = self.vault_mut(plan.vault_id)?;
        state.vault_staked_balance = state.vault_staked_balance.saturating_sub(plan.direct_deposit);

        self.emit_event(EventPayload::VaultDirectDeposit(VaultDirectDepositEvent {
            vault_id: plan.vault_id,
            staked_amount: plan.direct_deposit,
        }));
        Ok(())
    }

    fn commit_round(&mut self, plan: &BatchPlan, shares: u128) -> Result<RoundRecord, BatchingError> {
        let record = self.vault_mut(plan.vault_id)?.close_round(shares);

        self.emit_event(EventPayload::BatchDeposit(BatchDepositEvent {
            vault_id: plan.vault_id,
            round: plan.round,
            total_staked: record.total_staked,
            total_shares: record.total_shares,
        }));
        Ok(record)
    }
}
