// 11.0: every state change produces an event. used for audit trails, state reconstruction,
// and notifying external systems. the EventPayload enum lists all event types.

use crate::types::{AccountId, Bps, RoundId, SignedSize, Timestamp, TokenId, VaultId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Batching events
    Deposit(DepositEvent),
    VaultDirectDeposit(VaultDirectDepositEvent),
    BatchDeposit(BatchDepositEvent),
    SharesClaimed(SharesClaimedEvent),

    // Batching admin events
    VaultRegistered(VaultRegisteredEvent),
    KeeperUpdated(KeeperUpdatedEvent),
    DepositPaused,
    DepositUnpaused,

    // Range strategy events
    CollateralSettled(CollateralSettledEvent),
    RangeOrderUpdated(RangeOrderUpdatedEvent),
    TokenPositionClosed(TokenPositionClosedEvent),
    Rebalanced(RebalancedEvent),
    StrategyParamsUpdated(StrategyParamsUpdatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub vault_id: VaultId,
    pub round: RoundId,
    pub token: TokenId,
    pub receiver: AccountId,
    pub amount: u128,
    pub staked_amount: u128,
}

// harvested rewards routed straight to the pooled vault, no shares minted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultDirectDepositEvent {
    pub vault_id: VaultId,
    pub staked_amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDepositEvent {
    pub vault_id: VaultId,
    pub round: RoundId,
    pub total_staked: u128,
    pub total_shares: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharesClaimedEvent {
    pub vault_id: VaultId,
    pub from: AccountId,
    pub receiver: AccountId,
    pub amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRegisteredEvent {
    pub vault_id: VaultId,
    pub address: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperUpdatedEvent {
    pub old_keeper: AccountId,
    pub new_keeper: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralSettledEvent {
    pub account: AccountId,
    pub collateral_delta: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeOrderUpdatedEvent {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity_delta: i128,
    pub close_token_position: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPositionClosedEvent {
    pub requested: SignedSize,
    pub traded: SignedSize,
    pub notional: Decimal,
    pub reset_cleared: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancedEvent {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub is_reset: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyParamsUpdatedEvent {
    pub close_position_slippage_sqrt_tolerance_bps: Bps,
    pub reset_position_threshold_bps: Bps,
    pub min_notional_position_to_close_threshold: Decimal,
    pub rebalance_price_threshold_bps: Bps,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

// 11.1: bounded in-memory event log shared by both engines. each push is mirrored
// to tracing so a subscriber sees the same stream.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
    verbose: bool,
}

impl EventLog {
    pub fn new(max_events: usize, verbose: bool) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
            verbose,
        }
    }

    pub fn record(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        let event = Event::new(id, timestamp, payload);

        if self.verbose {
            tracing::info!(event_id = id.0, payload = ?event.payload, "vault event");
        } else {
            tracing::debug!(event_id = id.0, payload = ?event.payload, "vault event");
        }

        self.events.push(event);

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
        id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    // replays the retained log into an external observer
    pub fn forward_to<E: EventEmitter>(&self, emitter: &mut E) {
        for event in &self.events {
            emitter.emit(event.clone());
        }
    }
}
