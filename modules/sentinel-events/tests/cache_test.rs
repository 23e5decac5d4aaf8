//! EventCache behavior against the in-memory chain.

use std::sync::Arc;

use alloy::primitives::Address;
use sentinel_chain::testing::{self, MockTransport};
use sentinel_common::{ContractEvent, EventKind, SentinelError};
use sentinel_events::EventCache;

fn contract() -> Address {
    Address::repeat_byte(0xee)
}

fn sponsor() -> Address {
    Address::repeat_byte(0x01)
}

fn chain() -> Arc<MockTransport> {
    Arc::new(MockTransport::new(Address::repeat_byte(0xaa)).with_time(1_600_000_000))
}

fn cache(chain: &Arc<MockTransport>, starting_block: u64) -> EventCache {
    EventCache::new(chain.clone(), contract(), starting_block)
}

// ---------------------------------------------------------------------------
// Correlation scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_sponsor_carries_amounts_of_same_block_create() {
    let chain = chain();
    chain.set_height(100);
    chain.push_event(
        EventKind::PositionCreated,
        testing::position_created(80, 1, sponsor(), "1500", "100"),
    );
    chain.push_event(EventKind::NewSponsor, testing::new_sponsor(80, 1, sponsor()));

    let mut cache = cache(&chain, 50);
    let report = cache.synchronize().await.unwrap();

    assert_eq!(report.from_block, 50);
    assert_eq!(report.to_block, 100);
    assert_eq!(report.appended, 2);
    assert_eq!(cache.cursor(), 101);

    assert_eq!(cache.all_create_events().len(), 1);
    let new_sponsors = cache.all_new_sponsor_events();
    assert_eq!(new_sponsors.len(), 1);
    assert_eq!(new_sponsors[0].block_number, 80);
    assert_eq!(new_sponsors[0].payload.sponsor, sponsor());
    assert_eq!(new_sponsors[0].payload.collateral_amount.as_str(), "1500");
    assert_eq!(new_sponsors[0].payload.token_amount.as_str(), "100");
}

#[tokio::test]
async fn unmatched_new_sponsor_is_consistency_error() {
    let chain = chain();
    chain.set_height(100);
    chain.push_event(
        EventKind::PositionCreated,
        testing::position_created(80, 1, sponsor(), "1500", "100"),
    );
    chain.push_event(EventKind::NewSponsor, testing::new_sponsor(81, 2, sponsor()));

    let mut cache = cache(&chain, 50);
    let err = cache.synchronize().await.unwrap_err();

    assert!(matches!(
        err,
        SentinelError::Consistency { block_number: 81, matches: 0, .. }
    ));
    assert!(cache.all_new_sponsor_events().is_empty());
    assert_eq!(cache.cursor(), 50);
    assert!(cache.last_update_time().is_none());
    // The rest of the pass stays appended.
    assert_eq!(cache.all_create_events().len(), 1);
}

#[tokio::test]
async fn resync_after_consistency_error_rescans_the_same_range() {
    let chain = chain();
    chain.set_height(100);
    chain.push_event(EventKind::Deposit, testing::deposit(60, 1, sponsor(), "10"));
    chain.push_event(EventKind::NewSponsor, testing::new_sponsor(81, 2, sponsor()));

    let mut cache = cache(&chain, 50);
    for _ in 0..2 {
        let err = cache.synchronize().await.unwrap_err();
        assert!(matches!(err, SentinelError::Consistency { .. }));
        assert_eq!(cache.cursor(), 50);
    }

    // Both passes covered [50, 100], and each appended the uncorrelated kinds again.
    assert_eq!(chain.queries().len(), 2 * EventKind::ALL.len());
    assert_eq!(chain.scanned_ranges(), vec![(50, 100)]);
    let deposits = cache.all_deposit_events();
    assert_eq!(deposits.len(), 2);
    assert_eq!(deposits[0], deposits[1]);
    assert!(cache.all_new_sponsor_events().is_empty());
    assert!(cache.last_update_time().is_none());
}

#[tokio::test]
async fn two_creates_in_one_block_is_ambiguous() {
    let chain = chain();
    chain.set_height(10);
    let other = Address::repeat_byte(0x02);
    chain.push_event(EventKind::PositionCreated, testing::position_created(5, 1, sponsor(), "1", "1"));
    chain.push_event(EventKind::PositionCreated, testing::position_created(5, 2, other, "2", "2"));
    chain.push_event(EventKind::NewSponsor, testing::new_sponsor(5, 1, sponsor()));

    let mut cache = cache(&chain, 0);
    let err = cache.synchronize().await.unwrap_err();

    assert!(matches!(err, SentinelError::Consistency { matches: 2, .. }));
    assert!(cache.all_new_sponsor_events().is_empty());
}

// ---------------------------------------------------------------------------
// Cursor and ranges
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cursor_is_monotonic_and_ranges_are_contiguous() {
    let chain = chain();
    let mut cache = cache(&chain, 10);

    for height in [20, 20, 35, 36] {
        chain.set_height(height);
        let before = cache.cursor();
        cache.synchronize().await.unwrap();
        assert!(cache.cursor() >= before);
    }

    assert_eq!(cache.cursor(), 37);
    assert_eq!(chain.scanned_ranges(), vec![(10, 20), (21, 35), (36, 36)]);
}

#[tokio::test]
async fn every_kind_is_queried_each_pass() {
    let chain = chain();
    chain.set_height(5);
    let mut cache = cache(&chain, 0);
    cache.synchronize().await.unwrap();

    let mut kinds: Vec<EventKind> = chain.queries().iter().map(|q| q.kind).collect();
    kinds.sort();
    let mut all = EventKind::ALL.to_vec();
    all.sort();
    assert_eq!(kinds, all);
}

#[tokio::test]
async fn no_new_blocks_only_refreshes_timestamp() {
    let chain = chain();
    chain.set_height(30);
    let mut cache = cache(&chain, 0);
    cache.synchronize().await.unwrap();
    let queries = chain.queries().len();

    chain.set_time(1_600_000_100);
    let report = cache.synchronize().await.unwrap();

    assert!(!report.scanned());
    assert_eq!(report.appended, 0);
    assert_eq!(cache.cursor(), 31);
    assert_eq!(chain.queries().len(), queries);
    assert_eq!(cache.last_update_time().unwrap().timestamp(), 1_600_000_100);
}

#[tokio::test]
async fn last_update_time_comes_from_contract_clock() {
    let chain = chain();
    chain.set_height(1);
    let mut cache = cache(&chain, 0);
    assert!(cache.last_update_time().is_none());

    cache.synchronize().await.unwrap();
    assert_eq!(cache.last_update_time().unwrap().timestamp(), 1_600_000_000);
}

// ---------------------------------------------------------------------------
// Append-only history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn later_syncs_preserve_prefix_and_snapshots() {
    let chain = chain();
    chain.set_height(10);
    chain.push_event(EventKind::Deposit, testing::deposit(3, 1, sponsor(), "10"));
    chain.push_event(EventKind::Deposit, testing::deposit(7, 2, sponsor(), "20"));

    let mut cache = cache(&chain, 0);
    cache.synchronize().await.unwrap();
    let snapshot = cache.all_deposit_events().to_vec();
    let erased = cache.events(EventKind::Deposit);

    chain.push_event(EventKind::Deposit, testing::deposit(12, 3, sponsor(), "30"));
    chain.set_height(15);
    cache.synchronize().await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(erased.len(), 2);
    let deposits = cache.all_deposit_events();
    assert_eq!(deposits.len(), 3);
    assert_eq!(&deposits[..2], &snapshot[..]);
    assert_eq!(deposits[2].payload.collateral_amount.as_str(), "30");
}

#[tokio::test]
async fn events_are_typed_per_kind() {
    let chain = chain();
    let liquidator = Address::repeat_byte(0x0b);
    let disputer = Address::repeat_byte(0x0d);
    chain.set_height(50);
    chain.push_event(
        EventKind::LiquidationCreated,
        testing::liquidation_created(10, 1, sponsor(), liquidator, 0),
    );
    chain.push_event(
        EventKind::LiquidationDisputed,
        testing::liquidation_disputed(11, 2, sponsor(), liquidator, disputer, 0),
    );
    chain.push_event(
        EventKind::DisputeSettled,
        testing::dispute_settled(12, 3, sponsor(), liquidator, disputer, 0, true),
    );
    chain.push_event(EventKind::RegularFeePaid, testing::regular_fee_paid(13, 4, "5", "0"));
    chain.push_event(EventKind::FinalFeePaid, testing::final_fee_paid(14, 5, "7"));
    chain.push_event(
        EventKind::LiquidationWithdrawn,
        testing::liquidation_withdrawn(15, 6, liquidator, "150", 3),
    );
    chain.push_event(
        EventKind::SettleExpiredPosition,
        testing::settle_expired_position(16, 7, sponsor(), "90", "60"),
    );
    chain.push_event(EventKind::Withdrawal, testing::withdrawal(17, 8, sponsor(), "4"));
    chain.push_event(EventKind::Redeem, testing::redeem(18, 9, sponsor(), "6", "3"));

    let mut cache = cache(&chain, 0);
    let report = cache.synchronize().await.unwrap();
    assert_eq!(report.appended, 9);
    assert_eq!(cache.len(), 9);

    assert_eq!(cache.all_liquidation_events()[0].payload.liquidator, liquidator);
    assert_eq!(cache.all_dispute_events()[0].payload.disputer, disputer);
    assert!(cache.all_dispute_settlement_events()[0].payload.dispute_succeeded);
    assert_eq!(cache.all_regular_fee_events()[0].payload.regular_fee.as_str(), "5");
    assert_eq!(cache.all_final_fee_events()[0].payload.amount.as_str(), "7");
    assert_eq!(
        cache.all_liquidation_withdrawn_events()[0].payload.liquidation_status.as_str(),
        "3"
    );
    assert_eq!(
        cache.all_settle_expired_position_events()[0].payload.tokens_burned.as_str(),
        "60"
    );
    assert_eq!(cache.all_withdraw_events()[0].block_number, 17);
    assert_eq!(cache.all_redeem_events()[0].payload.token_amount.as_str(), "3");

    match &cache.events(EventKind::FinalFeePaid)[0] {
        ContractEvent::FinalFeePaid(record) => assert_eq!(record.block_number, 14),
        other => panic!("unexpected event: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Failure atomicity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_failure_leaves_cache_untouched() {
    let chain = chain();
    chain.set_height(10);
    chain.push_event(EventKind::Deposit, testing::deposit(3, 1, sponsor(), "10"));
    let mut cache = cache(&chain, 0);

    chain.fail_event_queries(1);
    let err = cache.synchronize().await.unwrap_err();
    assert!(matches!(err, SentinelError::Rpc { .. }));
    assert!(cache.is_empty());
    assert_eq!(cache.cursor(), 0);

    chain.fail_height_queries(1);
    assert!(cache.synchronize().await.is_err());
    assert_eq!(cache.cursor(), 0);

    chain.fail_reads(1);
    assert!(cache.synchronize().await.is_err());
    assert!(cache.is_empty());
    assert!(cache.last_update_time().is_none());

    cache.synchronize().await.unwrap();
    assert_eq!(cache.all_deposit_events().len(), 1);
    assert_eq!(cache.cursor(), 11);
}

#[tokio::test]
async fn malformed_event_is_decode_error() {
    let chain = chain();
    chain.set_height(10);
    chain.push_event(EventKind::Deposit, testing::deposit(3, 1, sponsor(), "10"));
    chain.push_event(EventKind::Deposit, testing::malformed_log(4, 2));

    let mut cache = cache(&chain, 0);
    let err = cache.synchronize().await.unwrap_err();
    assert!(matches!(
        err,
        SentinelError::Decode { kind: EventKind::Deposit, transaction_hash: Some(hash), .. }
            if hash == testing::tx_hash(2)
    ));
    assert!(cache.is_empty());
    assert_eq!(cache.cursor(), 0);
}

// ---------------------------------------------------------------------------
// Reset / rewind
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_clears_history_but_keeps_cursor() {
    let chain = chain();
    chain.set_height(10);
    chain.push_event(EventKind::Deposit, testing::deposit(3, 1, sponsor(), "10"));
    let mut cache = cache(&chain, 0);
    cache.synchronize().await.unwrap();
    let stamp = cache.last_update_time();

    cache.reset();
    assert!(cache.is_empty());
    assert!(cache.all_deposit_events().is_empty());
    assert_eq!(cache.cursor(), 11);
    assert_eq!(cache.last_update_time(), stamp);

    chain.set_height(12);
    cache.synchronize().await.unwrap();
    assert_eq!(chain.scanned_ranges().last(), Some(&(11, 12)));
    // Events before the cursor are not fetched again.
    assert!(cache.all_deposit_events().is_empty());
}

#[tokio::test]
async fn rewind_rescans_from_starting_block() {
    let chain = chain();
    chain.set_height(10);
    chain.push_event(EventKind::Deposit, testing::deposit(3, 1, sponsor(), "10"));
    let mut cache = cache(&chain, 2);
    cache.synchronize().await.unwrap();

    cache.rewind();
    assert_eq!(cache.cursor(), 2);
    assert!(cache.last_update_time().is_none());
    assert!(cache.is_empty());

    cache.synchronize().await.unwrap();
    assert_eq!(cache.all_deposit_events().len(), 1);
    assert_eq!(cache.cursor(), 11);
}
