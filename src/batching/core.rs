// 3.1 batching/core.rs: manager struct. vault registry, keeper, pause flag, event log.

use super::config::BatchingConfig;
use super::results::BatchingError;
use crate::account::VaultBatchState;
use crate::config::ConfigError;
use crate::events::{Event, EventLog, EventPayload, KeeperUpdatedEvent, VaultRegisteredEvent};
use crate::types::{AccountId, Timestamp, VaultId};

/** 3.1: all batching state lives here. vaults are an arena indexed by VaultId */
#[derive(Debug)]
pub struct BatchingManager {
    pub(super) config: BatchingConfig,
    pub(super) keeper: AccountId,
    pub(super) paused: bool,
    pub(super) vaults: Vec<VaultBatchState>,
    pub(super) log: EventLog,
    pub(super) current_time: Timestamp,
}

impl BatchingManager {
    pub fn new(config: BatchingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            keeper: config.keeper,
            paused: false,
            vaults: Vec::new(),
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

    pub fn address(&self) -> AccountId {
        self.config.manager
    }

    pub fn owner(&self) -> AccountId {
        self.config.owner
    }

    pub fn keeper(&self) -> AccountId {
        self.keeper
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn register_vault(&mut self, caller: AccountId, address: AccountId) -> Result<VaultId, BatchingError> {
        self.only_owner(caller)?;
        if address.is_null() {
            return Err(BatchingError::InvalidInput("vault address"));
        }
        if self.vaults.iter().any(|v| v.address == address) {
            return Err(BatchingError::VaultAlreadyRegistered(address));
        }
        if self.vaults.len() >= self.config.max_vaults {
            return Err(BatchingError::TooManyVaults(self.config.max_vaults));
        }

        let vault_id = VaultId(self.vaults.len() as u32);
        self.vaults.push(VaultBatchState::new(address));
        self.emit_event(EventPayload::VaultRegistered(VaultRegisteredEvent {
            vault_id,
            address,
        }));
        Ok(vault_id)
    }

    pub fn set_keeper(&mut self, caller: AccountId, keeper: AccountId) -> Result<(), BatchingError> {
        self.only_owner(caller)?;
        if keeper.is_null() {
            return Err(BatchingError::InvalidInput("keeper"));
        }
        let old_keeper = self.keeper;
        self.keeper = keeper;
        self.emit_event(EventPayload::KeeperUpdated(KeeperUpdatedEvent {
            old_keeper,
            new_keeper: keeper,
        }));
        Ok(())
    }

    pub fn pause_deposit(&mut self, caller: AccountId) -> Result<(), BatchingError> {
        self.only_keeper(caller)?;
        if !self.paused {
            self.paused = true;
            self.emit_event(EventPayload::DepositPaused);
        }
        Ok(())
    }

    pub fn unpause_deposit(&mut self, caller: AccountId) -> Result<(), BatchingError> {
        self.only_keeper(caller)?;
        self.lift_pause();
        Ok(())
    }

    pub fn vault_ids(&self) -> impl Iterator<Item = VaultId> + '_ {
        (0..self.vaults.len()).map(|i| VaultId(i as u32))
    }

    pub fn vault(&self, vault_id: VaultId) -> Result<&VaultBatchState, BatchingError> {
        self.vaults
            .get(vault_id.0 as usize)
            .ok_or(BatchingError::VaultNotFound(vault_id))
    }

    pub(super) fn vault_mut(&mut self, vault_id: VaultId) -> Result<&mut VaultBatchState, BatchingError> {
        self.vaults
            .get_mut(vault_id.0 as usize)
            .ok_or(BatchingError::VaultNotFound(vault_id))
    }

    pub fn events(&self) -> &[Event] {
        self.log.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.log.recent(count)
    }

    pub(super) fn lift_pause(&mut self) {
        if self.paused {
            self.paused = false;
            self.emit_event(EventPayload::DepositUnpaused);
        }
    }

    pub(super) fn only_owner(&self, caller: AccountId) -> Result<(), BatchingError> {
        if caller != self.config.owner {
            tracing::warn!(%caller, "owner-only call rejected");
            return Err(BatchingError::Unauthorized(caller));
        }
        Ok(())
    }

    pub(super) fn only_keeper(&self, caller: AccountId) -> Result<(), BatchingError> {
        if caller != self.keeper {
            tracing::warn!(%caller, "keeper-only call rejected");
            return Err(BatchingError::Unauthorized(caller));
        }
        Ok(())
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        self.log.record(self.current_time, payload);
    }
}
