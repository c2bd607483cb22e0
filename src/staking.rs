// 9.1 staking.rs: the stake-and-deposit venue the batching manager pools into.
// MOCKED. balances live in maps, no real token transfers.

use std::collections::HashMap;

use crate::math::mul_div_floor;
use crate::types::{AccountId, TokenId};
use crate::venue::VenueError;

// Trait for staking venues. Implement this for each chain integration.
pub trait StakingVenue {
    // Pull `amount` of `token` from `from` into the manager's custody
    fn transfer_in(&mut self, token: TokenId, from: AccountId, amount: u128) -> Result<(), VenueError>;

    // Return custody tokens to `to`, used when a stake falls through
    fn transfer_out(&mut self, token: TokenId, to: AccountId, amount: u128) -> Result<(), VenueError>;

    // Pull already staked asset from `from` into the manager's custody
    fn transfer_staked_in(&mut self, from: AccountId, amount: u128) -> Result<(), VenueError>;

    // Convert custody tokens into the staked intermediate asset
    fn stake(&mut self, token: TokenId, amount: u128, min_output: u128) -> Result<u128, VenueError>;

    // Deposit staked asset into the pooled vault, shares are minted to `depositor`
    fn deposit(&mut self, vault: AccountId, staked_amount: u128, depositor: AccountId) -> Result<u128, VenueError>;

    // Hand staked asset to the vault without minting shares
    fn transfer_staked(&mut self, vault: AccountId, amount: u128) -> Result<(), VenueError>;

    // Move vault shares out of the manager's custody
    fn transfer_shares(&mut self, vault: AccountId, to: AccountId, amount: u128) -> Result<(), VenueError>;
}

const RATE_ONE: u128 = 10_000;

// In-memory venue for tests and the simulator
#[derive(Debug, Clone)]
pub struct MockStakingVenue {
    // manager address, holder of custody tokens, staked asset and minted shares
    manager: AccountId,
    token_balances: HashMap<(TokenId, AccountId), u128>,
    // staked units per token unit, 10_000 = 1:1
    stake_rates: HashMap<TokenId, u128>,
    // shares per staked unit, 10_000 = 1:1
    share_rates: HashMap<AccountId, u128>,
    staked_balances: HashMap<AccountId, u128>,
    staked_custody: u128,
    vault_assets: HashMap<AccountId, u128>,
    share_balances: HashMap<(AccountId, AccountId), u128>,
    pub fail_stake: bool,
    pub fail_deposit: bool,
    // reject deposits into one vault only
    pub fail_deposit_into: Option<AccountId>,
    pub fail_transfer: bool,
}

impl MockStakingVenue {
    pub fn new(manager: AccountId) -> Self {
        Self {
            manager,
            token_balances: HashMap::new(),
            stake_rates: HashMap::new(),
            share_rates: HashMap::new(),
            staked_balances: HashMap::new(),
            staked_custody: 0,
            vault_assets: HashMap::new(),
            share_balances: HashMap::new(),
            fail_stake: false,
            fail_deposit: false,
            fail_deposit_into: None,
            fail_transfer: false,
        }
    }

    pub fn fund(&mut self, token: TokenId, account: AccountId, amount: u128) {
        *self.token_balances.entry((token, account)).or_insert(0) += amount;
    }

    pub fn set_stake_rate(&mut self, token: TokenId, rate: u128) {
        self.stake_rates.insert(token, rate);
    }

    pub fn set_share_rate(&mut self, vault: AccountId, rate: u128) {
        self.share_rates.insert(vault, rate);
    }

    pub fn fund_staked(&mut self, account: AccountId, amount: u128) {
        *self.staked_balances.entry(account).or_insert(0) += amount;
    }

    pub fn staked_balance(&self, account: AccountId) -> u128 {
        self.staked_balances.get(&account).copied().unwrap_or(0)
    }

    pub fn token_balance(&self, token: TokenId, account: AccountId) -> u128 {
        self.token_balances.get(&(token, account)).copied().unwrap_or(0)
    }

    pub fn staked_custody(&self) -> u128 {
        self.staked_custody
    }

    pub fn vault_assets(&self, vault: AccountId) -> u128 {
        self.vault_assets.get(&vault).copied().unwrap_or(0)
    }

    pub fn share_balance(&self, vault: AccountId, holder: AccountId) -> u128 {
        self.share_balances.get(&(vault, holder)).copied().unwrap_or(0)
    }

    fn take_staked(&mut self, amount: u128) -> Result<(), VenueError> {
        if amount > self.staked_custody {
            return Err(VenueError::InsufficientBalance {
                requested: amount,
                available: self.staked_custody,
            });
        }
        self.staked_custody -= amount;
        Ok(())
    }
}

impl StakingVenue for MockStakingVenue {
    fn transfer_in(&mut self, token: TokenId, from: AccountId, amount: u128) -> Result<(), VenueError> {
        if self.fail_transfer {
            return Err(VenueError::Rejected("transfer disabled".to_string()));
        }
        let available = self.token_balance(token, from);
        if amount > available {
            return Err(VenueError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.token_balances.insert((token, from), available - amount);
        *self.token_balances.entry((token, self.manager)).or_insert(0) += amount;
        Ok(())
    }

    fn transfer_out(&mut self, token: TokenId, to: AccountId, amount: u128) -> Result<(), VenueError> {
        let held = self.token_balance(token, self.manager);
        if amount > held {
            return Err(VenueError::InsufficientBalance {
                requested: amount,
                available: held,
            });
        }
        self.token_balances.insert((token, self.manager), held - amount);
        *self.token_balances.entry((token, to)).or_insert(0) += amount;
        Ok(())
    }

    fn transfer_staked_in(&mut self, from: AccountId, amount: u128) -> Result<(), VenueError> {
        if self.fail_transfer {
            return Err(VenueError::Rejected("transfer disabled".to_string()));
        }
        let available = self.staked_balance(from);
        if amount > available {
            return Err(VenueError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.staked_balances.insert(from, available - amount);
        self.staked_custody += amount;
        Ok(())
    }

    fn stake(&mut self, token: TokenId, amount: u128, min_output: u128) -> Result<u128, VenueError> {
        if self.fail_stake {
            return Err(VenueError::Rejected("stake disabled".to_string()));
        }
        let rate = self.stake_rates.get(&token).copied().unwrap_or(RATE_ONE);
        let staked = mul_div_floor(amount, rate, RATE_ONE)
            .map_err(|e| VenueError::Rejected(e.to_string()))?;
        if staked < min_output {
            return Err(VenueError::SlippageExceeded {
                min_output,
                actual: staked,
            });
        }

        let held = self.token_balance(token, self.manager);
        if amount > held {
            return Err(VenueError::InsufficientBalance {
                requested: amount,
                available: held,
            });
        }
        self.token_balances.insert((token, self.manager), held - amount);
        self.staked_custody += staked;
        Ok(staked)
    }

    fn deposit(&mut self, vault: AccountId, staked_amount: u128, depositor: AccountId) -> Result<u128, VenueError> {
        if self.fail_deposit || self.fail_deposit_into == Some(vault) {
            return Err(VenueError::Rejected("deposit disabled".to_string()));
        }
        let rate = self.share_rates.get(&vault).copied().unwrap_or(RATE_ONE);
        let shares = mul_div_floor(staked_amount, rate, RATE_ONE)
            .map_err(|e| VenueError::Rejected(e.to_string()))?;

        self.take_staked(staked_amount)?;
        *self.vault_assets.entry(vault).or_insert(0) += staked_amount;
        *self.share_balances.entry((vault, depositor)).or_insert(0) += shares;
        Ok(shares)
    }

    fn transfer_staked(&mut self, vault: AccountId, amount: u128) -> Result<(), VenueError> {
        if self.fail_transfer {
            return Err(VenueError::Rejected("transfer disabled".to_string()));
        }
        self.take_staked(amount)?;
        *self.vault_assets.entry(vault).or_insert(0) += amount;
        Ok(())
    }

    fn transfer_shares(&mut self, vault: AccountId, to: AccountId, amount: u128) -> Result<(), VenueError> {
        if self.fail_transfer {
            return Err(VenueError::Rejected("transfer disabled".to_string()));
        }
        let held = self.share_balance(vault, self.manager);
        if amount > held {
            return Err(VenueError::InsufficientBalance {
                requested: amount,
                available: held,
            });
        }
        self.share_balances.insert((vault, self.manager), held - amount);
        *self.share_balances.entry((vault, to)).or_insert(0) += amount;
        Ok(())
    }
}
