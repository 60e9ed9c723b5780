#![allow(non_snake_case)]
use std::time::Duration;

use rand::{
    SeedableRng,
    rngs::StdRng,
};
use spinwheel::{
    balance::BalanceTracker,
    client::AppController,
    config::{
        AppConfig,
        NetworkTarget,
    },
    fake_ledger::FakeLedger,
    ledger::{
        Address,
        TOKEN_UNIT,
    },
    wheel::default_prize_table,
};

fn owner() -> Address {
    Address::new([0x11; 20])
}

fn wheel_contract() -> Address {
    Address::new([0x33; 20])
}

fn ledger_with(balance_tokens: u128) -> FakeLedger {
    FakeLedger::new(owner(), wheel_contract(), &default_prize_table())
        .with_balance(balance_tokens * TOKEN_UNIT)
}

#[tokio::test]
async fn refresh__caches_the_fetched_balance() {
    // given
    let ledger = ledger_with(5);
    let mut tracker = BalanceTracker::new(owner());
    assert_eq!(tracker.current(), None);

    // when
    let fetched = tracker.refresh(&ledger).await.unwrap();

    // then
    assert_eq!(fetched, 5 * TOKEN_UNIT);
    assert_eq!(tracker.current(), Some(5 * TOKEN_UNIT));
}

#[tokio::test]
async fn refresh__keeps_last_known_value_on_failure() {
    // given
    let ledger = ledger_with(5);
    let mut tracker = BalanceTracker::new(owner());
    tracker.refresh(&ledger).await.unwrap();

    // when
    ledger.set_fail_queries(true);
    let result = tracker.refresh(&ledger).await;

    // then: the failure is reported, the cache is not cleared
    assert!(result.is_err());
    assert_eq!(tracker.current(), Some(5 * TOKEN_UNIT));
}

#[tokio::test]
async fn refresh__last_response_wins_after_recovery() {
    // given
    let ledger = ledger_with(5);
    let mut tracker = BalanceTracker::new(owner());
    tracker.refresh(&ledger).await.unwrap();

    // when: a failure followed by a recovered query with a new amount
    ledger.set_fail_queries(true);
    let _ = tracker.refresh(&ledger).await;
    ledger.set_fail_queries(false);
    ledger.credit(owner(), 3 * TOKEN_UNIT);
    tracker.refresh(&ledger).await.unwrap();

    // then
    assert_eq!(tracker.current(), Some(8 * TOKEN_UNIT));
}

#[tokio::test]
async fn buy_tokens__credits_the_balance_after_refresh() {
    // given
    let config = AppConfig {
        network: NetworkTarget::InProcess,
        player: owner(),
        token_contract: Address::new([0x22; 20]),
        wheel_contract: wheel_contract(),
        min_allowance: TOKEN_UNIT,
        wager_unit: TOKEN_UNIT,
        spin_duration: Duration::from_millis(1),
        refresh_interval: Duration::from_millis(50),
    };
    let mut controller = AppController::with_rng(
        config,
        ledger_with(10),
        &mut StdRng::seed_from_u64(1),
    );
    controller.connect().await;

    // when
    controller.buy_tokens().await;

    // then
    let snap = controller.snapshot();
    assert_eq!(snap.balance, Some(20 * TOKEN_UNIT));
    assert!(snap.status.contains("Purchased"));
}
