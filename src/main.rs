//! Yield Vault Core Simulation.
//!
//! Walks the batching manager and the range strategy through their lifecycles
//! against the in-memory staking venue and clearing house.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use yield_vault_core::*;

const USDC: TokenId = TokenId(1);
const VAULT: AccountId = AccountId(0x900);

fn main() {
    println!("Yield Vault Core Simulation");
    println!("Round Batching, 80/20 Range Strategy\n");

    scenario_1_batched_rounds();
    scenario_2_harvested_rewards();
    scenario_3_first_deposit_range();
    scenario_4_rebalance_on_price_move();
    scenario_5_reset_close();
    scenario_6_stress_test();

    println!("\nAll simulations completed successfully.");
}

fn batching_setup() -> (BatchingManager, MockStakingVenue, VaultId) {
    let mut manager = BatchingManager::new(BatchingConfig::default()).unwrap();
    let owner = manager.owner();
    let vault = manager.register_vault(owner, VAULT).unwrap();
    let venue = MockStakingVenue::new(manager.address());
    (manager, venue, vault)
}

/// Two rounds of deposits, settled at different share ratios.
fn scenario_1_batched_rounds() {
    println!("Scenario 1: Batched Deposit Rounds\n");

    let (mut manager, mut venue, vault) = batching_setup();
    manager.set_time(Timestamp::now());
    let keeper = manager.keeper();
    let alice = AccountId(1);
    let bob = AccountId(2);
    venue.fund(USDC, alice, 1_000);
    venue.fund(USDC, bob, 1_000);

    manager.deposit_token(&mut venue, alice, vault, USDC, 600, 0, alice).unwrap();
    manager.deposit_token(&mut venue, bob, vault, USDC, 400, 0, bob).unwrap();
    println!("  Round 1: Alice deposits 600, Bob deposits 400");

    let result = manager.execute_batch_deposit(&mut venue, keeper, vault).unwrap();
    println!("  Keeper batch: {} staked, {} shares minted", result.total_staked, result.total_shares);

    venue.set_share_rate(VAULT, 8_000);
    manager.deposit_token(&mut venue, alice, vault, USDC, 250, 0, alice).unwrap();
    manager.execute_batch_deposit(&mut venue, keeper, vault).unwrap();
    println!("  Round 2: Alice deposits 250 at 0.8 shares per unit");

    println!(
        "  Alice: {} unclaimed shares, Bob: {} unclaimed shares",
        manager.unclaimed_shares(vault, alice).unwrap(),
        manager.unclaimed_shares(vault, bob).unwrap()
    );

    manager.claim(&mut venue, alice, vault, alice, 800).unwrap();
    match manager.claim(&mut venue, bob, vault, bob, 500) {
        Err(BatchingError::InsufficientShares { available }) => {
            println!("  Bob over-claims 500, rejected with {} available", available)
        }
        other => println!("  unexpected claim result: {:?}", other),
    }
    println!("  Alice claims 800, holds {} vault shares\n", venue.share_balance(VAULT, alice));
}

/// Harvested rewards go to the vault without minting shares.
fn scenario_2_harvested_rewards() {
    println!("Scenario 2: Harvested Reward Path\n");

    let (mut manager, mut venue, vault) = batching_setup();
    let keeper = manager.keeper();
    let harvester = AccountId(7);
    venue.fund(USDC, harvester, 500);
    venue.set_stake_rate(USDC, 9_500);

    manager.deposit_token(&mut venue, harvester, vault, USDC, 500, 450, VAULT).unwrap();
    println!("  Harvester deposits 500 USDC to the vault itself, staked at 0.95");
    println!("  Vault staked balance: {}", manager.vault_staked_balance(vault).unwrap());

    manager.pause_deposit(keeper).unwrap();
    println!("  Keeper pauses deposits, paused: {}", manager.is_paused());

    let result = manager.execute_batch_deposit(&mut venue, keeper, vault).unwrap();
    println!(
        "  Batch pushes {} directly, round closed: {:?}, paused: {}",
        result.direct_deposit,
        result.round,
        manager.is_paused()
    );
    println!("  Vault assets at venue: {}\n", venue.vault_assets(VAULT));
}

fn range_setup(sqrt_price: Decimal) -> (RangeStrategy, MockClearingHouse, FixedAssetPrice) {
    let strategy = RangeStrategy::new(RangeStrategyConfig::default()).unwrap();
    let ch = MockClearingHouse::new(sqrt_price);
    let pricer = FixedAssetPrice(Price::new_unchecked(dec!(1)));
    (strategy, ch, pricer)
}

/// First deposit opens the base range around TWAP.
fn scenario_3_first_deposit_range() {
    println!("Scenario 3: First Deposit Opens Range\n");

    let (mut strategy, mut ch, pricer) = range_setup(dec!(40));
    let change = strategy.after_deposit_ranges(&mut ch, &pricer, dec!(10000), dec!(10000)).unwrap();
    println!(
        "  Deposit 10,000 at price 1,600: ticks [{}, {}], liquidity {}",
        change.tick_lower, change.tick_upper, change.liquidity_delta
    );

    let change = strategy.after_deposit_ranges(&mut ch, &pricer, dec!(12500), dec!(2500)).unwrap();
    println!("  Deposit 2,500 more: liquidity +{}", change.liquidity_delta);

    let sim = strategy.simulate_before_withdraw(&ch, &pricer, dec!(12500), dec!(5000)).unwrap();
    println!(
        "  Withdraw preview of 5,000: liquidity {}, tokens to trade {}",
        sim.liquidity_delta, sim.tokens_to_trade
    );

    let change = strategy.before_withdraw_ranges(&mut ch, &pricer, dec!(12500), dec!(5000)).unwrap();
    println!("  Withdraw 5,000: liquidity {}", change.liquidity_delta);
    println!("  Margin posted: {}\n", ch.margin(strategy.account()));
}

/// Price drifts out of the band, range follows with the same liquidity.
fn scenario_4_rebalance_on_price_move() {
    println!("Scenario 4: Rebalance on Price Move\n");

    let (mut strategy, mut ch, pricer) = range_setup(dec!(40));
    strategy.set_time(Timestamp::now());
    strategy.after_deposit_ranges(&mut ch, &pricer, dec!(10000), dec!(10000)).unwrap();

    for sqrt in [dec!(42), dec!(48), dec!(56)] {
        ch.set_sqrt_price(sqrt);
        let valid = strategy.is_valid_rebalance_range(&ch, dec!(10000)).unwrap();
        if valid {
            println!("  Price {}: inside band, no rebalance", sqrt * sqrt);
            continue;
        }
        strategy.advance_time(60 * 60 * 1000);
        let result = strategy.rebalance_ranges(&mut ch, SignedSize::zero(), dec!(10000)).unwrap();
        println!(
            "  Price {}: moved to [{}, {}], liquidity {}",
            sqrt * sqrt,
            result.range.base_tick_lower,
            result.range.base_tick_upper,
            result.range.base_liquidity
        );
    }
    println!("  Events generated: {}\n", strategy.events().len());
}

/// Net position exceeds the reset threshold and gets flattened.
fn scenario_5_reset_close() {
    println!("Scenario 5: Reset-Driven Close\n");

    let (mut strategy, mut ch, pricer) = range_setup(dec!(40));
    strategy.after_deposit_ranges(&mut ch, &pricer, dec!(10000), dec!(10000)).unwrap();
    let account = strategy.account();

    ch.set_net_position(account, dec!(-4));
    ch.fill_ratio = dec!(0.5);
    println!("  Net position -4 tokens at 1,600 = 6,400 notional vs 2,000 threshold");

    let result = strategy.rebalance_ranges(&mut ch, SignedSize::new(dec!(-4)), dec!(10000)).unwrap();
    if let Some(close) = result.close {
        println!(
            "  Rebalance closes {} of {}, reset cleared: {}",
            close.traded, close.requested, close.reset_cleared
        );
    }

    let position = ch.net_token_position(account, strategy.pool()).unwrap();
    ch.fill_ratio = Decimal::ONE;
    let close = strategy.close_token_position_on_reset(&mut ch, position).unwrap();
    println!(
        "  Follow-up close trades {}, reset active: {}",
        close.traded,
        strategy.is_reset()
    );
    println!(
        "  Remaining position: {}\n",
        ch.net_token_position(account, strategy.pool()).unwrap()
    );
}

/// Many depositors over many rounds, conservation checked at the end.
fn scenario_6_stress_test() {
    println!("Scenario 6: Stress Test\n");

    let (mut manager, mut venue, vault) = batching_setup();
    let keeper = manager.keeper();
    let users: Vec<AccountId> = (1..=25).map(AccountId).collect();
    for &user in &users {
        venue.fund(USDC, user, 1_000_000);
    }

    let mut rounds = 0;
    for round in 0..10u128 {
        venue.set_share_rate(VAULT, 7_000 + round * 700);
        for (i, &user) in users.iter().enumerate() {
            if (i as u128 + round) % 3 == 0 {
                continue;
            }
            let amount = 100 + (i as u128 * 37 + round * 11) % 900;
            manager.deposit_token(&mut venue, user, vault, USDC, amount, 0, user).unwrap();
        }
        if manager.execute_batch_deposit(&mut venue, keeper, vault).is_ok() {
            rounds += 1;
        }
    }

    let mut owed = 0u128;
    for &user in &users {
        owed += manager.unclaimed_shares(vault, user).unwrap();
    }
    let minted = venue.share_balance(VAULT, manager.address());

    println!("  {} users over {} rounds", users.len(), rounds);
    println!("  Shares minted: {}, owed to users: {}, rounding dust: {}", minted, owed, minted - owed);
    println!("  Current round: {}", manager.current_round(vault).unwrap());
    println!("  Events generated: {}\n", manager.events().len());
}
