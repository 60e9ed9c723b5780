#![allow(non_snake_case)]
use spinwheel::{
    allowance::{
        AllowanceManager,
        ApprovalError,
        UNLIMITED_ALLOWANCE,
    },
    fake_ledger::FakeLedger,
    ledger::{
        Address,
        LedgerSubmit,
        TOKEN_UNIT,
    },
    wheel::default_prize_table,
};

fn owner() -> Address {
    Address::new([0x11; 20])
}

fn spender() -> Address {
    Address::new([0x33; 20])
}

fn fixture() -> (FakeLedger, AllowanceManager) {
    let ledger = FakeLedger::new(owner(), spender(), &default_prize_table());
    let manager = AllowanceManager::new(owner(), spender(), TOKEN_UNIT);
    (ledger, manager)
}

#[tokio::test]
async fn check__reads_granted_amount_from_ledger() {
    // given
    let (ledger, mut manager) = fixture();
    ledger.approve(spender(), 5 * TOKEN_UNIT).await.unwrap();

    // when
    let state = manager.check(&ledger).await;

    // then
    assert_eq!(state.granted, 5 * TOKEN_UNIT);
    assert!(state.is_sufficient());
}

#[tokio::test]
async fn check__fails_closed_when_query_fails() {
    // given: an allowance that was previously confirmed sufficient
    let (ledger, mut manager) = fixture();
    ledger.approve(spender(), UNLIMITED_ALLOWANCE).await.unwrap();
    assert!(manager.check(&ledger).await.is_sufficient());

    // when: the ledger becomes unreadable
    ledger.set_fail_queries(true);
    let state = manager.check(&ledger).await;

    // then: wagering locks again rather than trusting stale permission
    assert!(!state.is_sufficient());
}

#[tokio::test]
async fn request_approval__is_confirmed_by_requery() {
    // given
    let (ledger, mut manager) = fixture();
    assert!(!manager.state().is_sufficient());

    // when
    let state = manager.request_approval(&ledger, &ledger).await.unwrap();

    // then
    assert!(state.is_sufficient());
    assert_eq!(state.granted, UNLIMITED_ALLOWANCE);
}

#[tokio::test]
async fn request_approval__rejected_submission_surfaces() {
    // given
    let (ledger, mut manager) = fixture();
    ledger.set_reject_submissions(true);

    // when
    let result = manager.request_approval(&ledger, &ledger).await;

    // then
    assert!(matches!(result, Err(ApprovalError::Rejected(_))));
    assert!(!manager.state().is_sufficient());
}

#[tokio::test]
async fn request_approval__submission_alone_does_not_grant() {
    // given: the approval finalizes but the confirming re-query fails
    let (ledger, mut manager) = fixture();
    ledger.set_fail_queries(true);

    // when
    let result = manager.request_approval(&ledger, &ledger).await;

    // then
    assert_eq!(result, Err(ApprovalError::NotConfirmed));
    assert!(!manager.state().is_sufficient());
}
