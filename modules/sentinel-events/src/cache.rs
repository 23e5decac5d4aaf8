//! EventCache: append-only, per-kind history of one contract's events.
//!
//! A sync pass is all-or-nothing with one exception: a failed `NewSponsor`
//! correlation still appends the other kinds of that pass, but leaves the
//! cursor and the timestamp where they were.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use sentinel_chain::{decode_log, ChainTransport, ContractCall, DecodedLog};
use sentinel_common::{
    ContractEvent, Deposit, DisputeSettled, EventKind, EventRecord, FinalFeePaid,
    LiquidationCreated, LiquidationDisputed, LiquidationWithdrawn, NewSponsor, NewSponsorLog,
    PositionCreated, Redeem, RegularFeePaid, SentinelError, SettleExpiredPosition, Withdrawal,
};

use crate::correlate::correlate_new_sponsors;
use crate::types::SyncReport;

// ---------------------------------------------------------------------------
// Histories
// ---------------------------------------------------------------------------

/// One ordered sequence per kind.
#[derive(Debug, Clone, Default)]
struct Histories {
    liquidations: Vec<EventRecord<LiquidationCreated>>,
    disputes: Vec<EventRecord<LiquidationDisputed>>,
    dispute_settlements: Vec<EventRecord<DisputeSettled>>,
    creates: Vec<EventRecord<PositionCreated>>,
    new_sponsors: Vec<EventRecord<NewSponsor>>,
    deposits: Vec<EventRecord<Deposit>>,
    withdrawals: Vec<EventRecord<Withdrawal>>,
    redemptions: Vec<EventRecord<Redeem>>,
    regular_fees: Vec<EventRecord<RegularFeePaid>>,
    final_fees: Vec<EventRecord<FinalFeePaid>>,
    liquidation_withdrawals: Vec<EventRecord<LiquidationWithdrawn>>,
    expired_settlements: Vec<EventRecord<SettleExpiredPosition>>,
}

impl Histories {
    fn len(&self) -> usize {
        self.liquidations.len()
            + self.disputes.len()
            + self.dispute_settlements.len()
            + self.creates.len()
            + self.new_sponsors.len()
            + self.deposits.len()
            + self.withdrawals.len()
            + self.redemptions.len()
            + self.regular_fees.len()
            + self.final_fees.len()
            + self.liquidation_withdrawals.len()
            + self.expired_settlements.len()
    }

    fn append(&mut self, batch: Histories) {
        self.liquidations.extend(batch.liquidations);
        self.disputes.extend(batch.disputes);
        self.dispute_settlements.extend(batch.dispute_settlements);
        self.creates.extend(batch.creates);
        self.new_sponsors.extend(batch.new_sponsors);
        self.deposits.extend(batch.deposits);
        self.withdrawals.extend(batch.withdrawals);
        self.redemptions.extend(batch.redemptions);
        self.regular_fees.extend(batch.regular_fees);
        self.final_fees.extend(batch.final_fees);
        self.liquidation_withdrawals.extend(batch.liquidation_withdrawals);
        self.expired_settlements.extend(batch.expired_settlements);
    }

    fn push(&mut self, event: ContractEvent) {
        match event {
            ContractEvent::LiquidationCreated(r) => self.liquidations.push(r),
            ContractEvent::LiquidationDisputed(r) => self.disputes.push(r),
            ContractEvent::DisputeSettled(r) => self.dispute_settlements.push(r),
            ContractEvent::PositionCreated(r) => self.creates.push(r),
            ContractEvent::NewSponsor(r) => self.new_sponsors.push(r),
            ContractEvent::Deposit(r) => self.deposits.push(r),
            ContractEvent::Withdrawal(r) => self.withdrawals.push(r),
            ContractEvent::Redeem(r) => self.redemptions.push(r),
            ContractEvent::RegularFeePaid(r) => self.regular_fees.push(r),
            ContractEvent::FinalFeePaid(r) => self.final_fees.push(r),
            ContractEvent::LiquidationWithdrawn(r) => self.liquidation_withdrawals.push(r),
            ContractEvent::SettleExpiredPosition(r) => self.expired_settlements.push(r),
        }
    }
}

fn wrap<P: Clone>(
    records: &[EventRecord<P>],
    f: fn(EventRecord<P>) -> ContractEvent,
) -> Vec<ContractEvent> {
    records.iter().cloned().map(f).collect()
}

// ---------------------------------------------------------------------------
// EventCache
// ---------------------------------------------------------------------------

/// In-memory history of one contract, advanced by `synchronize`.
///
/// Owned by a single writer. `synchronize` takes `&mut self`; every reader
/// gets either a borrowed slice or an owned copy.
pub struct EventCache {
    transport: Arc<dyn ChainTransport>,
    contract_address: Address,
    starting_block: u64,
    cursor: u64,
    last_update_time: Option<DateTime<Utc>>,
    histories: Histories,
}

impl EventCache {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        contract_address: Address,
        starting_block: u64,
    ) -> Self {
        Self {
            transport,
            contract_address,
            starting_block,
            cursor: starting_block,
            last_update_time: None,
            histories: Histories::default(),
        }
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn starting_block(&self) -> u64 {
        self.starting_block
    }

    /// Next block a sync will scan from.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Contract clock at the last successful sync. `None` before the first one.
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_update_time
    }

    /// Total records held across all kinds.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scan `[cursor, height]` for every kind and append what was found.
    pub async fn synchronize(&mut self) -> Result<SyncReport, SentinelError> {
        let height = self
            .transport
            .current_block_height()
            .await
            .map_err(|e| SentinelError::rpc("current_block_height", e))?;

        let from_block = self.cursor;
        if height < from_block {
            let now = self.contract_time().await?;
            self.last_update_time = Some(now);
            debug!(
                contract = %self.contract_address,
                cursor = from_block,
                height,
                "No new blocks"
            );
            return Ok(SyncReport {
                from_block,
                to_block: height,
                appended: 0,
            });
        }

        let fetched = self.fetch_range(from_block, height).await?;
        let (batch, sponsor_logs) = decode_batch(fetched)?;
        let now = self.contract_time().await?;

        let correlated = correlate_new_sponsors(&batch.creates, &sponsor_logs);
        let mut appended = batch.len();
        self.histories.append(batch);

        let new_sponsors = match correlated {
            Ok(new_sponsors) => new_sponsors,
            Err(e) => {
                warn!(
                    contract = %self.contract_address,
                    from_block,
                    to_block = height,
                    error = %e,
                    "NewSponsor correlation failed, cursor not advanced"
                );
                return Err(e);
            }
        };
        appended += new_sponsors.len();
        self.histories.new_sponsors.extend(new_sponsors);

        self.cursor = height + 1;
        self.last_update_time = Some(now);

        if appended > 0 {
            info!(
                contract = %self.contract_address,
                from_block,
                to_block = height,
                appended,
                "Synchronized events"
            );
        } else {
            debug!(
                contract = %self.contract_address,
                from_block,
                to_block = height,
                "Synchronized, no new events"
            );
        }

        Ok(SyncReport {
            from_block,
            to_block: height,
            appended,
        })
    }

    /// Clear every sequence. The cursor and the timestamp are kept, so events
    /// before the cursor are not fetched again.
    pub fn reset(&mut self) {
        self.histories = Histories::default();
    }

    /// Clear every sequence and move the cursor back to the starting block.
    pub fn rewind(&mut self) {
        self.histories = Histories::default();
        self.cursor = self.starting_block;
        self.last_update_time = None;
    }

    async fn fetch_range(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(EventKind, Vec<Log>)>, SentinelError> {
        let transport = &self.transport;
        let queries = EventKind::ALL.iter().map(|&kind| async move {
            transport
                .past_events(kind, from_block, to_block)
                .await
                .map(|events| (kind, events))
                .map_err(|e| {
                    SentinelError::rpc(format!("past_events({kind}, {from_block}..={to_block})"), e)
                })
        });
        try_join_all(queries).await
    }

    async fn contract_time(&self) -> Result<DateTime<Utc>, SentinelError> {
        let value = self
            .transport
            .read_contract_value(ContractCall::CurrentTime)
            .await
            .and_then(|v| v.as_uint())
            .map_err(|e| SentinelError::rpc("getCurrentTime", e))?;

        timestamp(value).ok_or_else(|| {
            SentinelError::rpc(
                "getCurrentTime",
                anyhow::anyhow!("contract time {value} is not a valid timestamp"),
            )
        })
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn all_liquidation_events(&self) -> &[EventRecord<LiquidationCreated>] {
        &self.histories.liquidations
    }

    pub fn all_dispute_events(&self) -> &[EventRecord<LiquidationDisputed>] {
        &self.histories.disputes
    }

    pub fn all_dispute_settlement_events(&self) -> &[EventRecord<DisputeSettled>] {
        &self.histories.dispute_settlements
    }

    pub fn all_create_events(&self) -> &[EventRecord<PositionCreated>] {
        &self.histories.creates
    }

    /// `NewSponsor` records, amounts copied from their `PositionCreated`.
    pub fn all_new_sponsor_events(&self) -> &[EventRecord<NewSponsor>] {
        &self.histories.new_sponsors
    }

    pub fn all_deposit_events(&self) -> &[EventRecord<Deposit>] {
        &self.histories.deposits
    }

    pub fn all_withdraw_events(&self) -> &[EventRecord<Withdrawal>] {
        &self.histories.withdrawals
    }

    pub fn all_redeem_events(&self) -> &[EventRecord<Redeem>] {
        &self.histories.redemptions
    }

    pub fn all_regular_fee_events(&self) -> &[EventRecord<RegularFeePaid>] {
        &self.histories.regular_fees
    }

    pub fn all_final_fee_events(&self) -> &[EventRecord<FinalFeePaid>] {
        &self.histories.final_fees
    }

    pub fn all_liquidation_withdrawn_events(&self) -> &[EventRecord<LiquidationWithdrawn>] {
        &self.histories.liquidation_withdrawals
    }

    pub fn all_settle_expired_position_events(&self) -> &[EventRecord<SettleExpiredPosition>] {
        &self.histories.expired_settlements
    }

    /// Owned copy of one kind's sequence, in insertion order.
    pub fn events(&self, kind: EventKind) -> Vec<ContractEvent> {
        let h = &self.histories;
        match kind {
            EventKind::LiquidationCreated => wrap(&h.liquidations, ContractEvent::LiquidationCreated),
            EventKind::LiquidationDisputed => wrap(&h.disputes, ContractEvent::LiquidationDisputed),
            EventKind::DisputeSettled => wrap(&h.dispute_settlements, ContractEvent::DisputeSettled),
            EventKind::PositionCreated => wrap(&h.creates, ContractEvent::PositionCreated),
            EventKind::NewSponsor => wrap(&h.new_sponsors, ContractEvent::NewSponsor),
            EventKind::Deposit => wrap(&h.deposits, ContractEvent::Deposit),
            EventKind::Withdrawal => wrap(&h.withdrawals, ContractEvent::Withdrawal),
            EventKind::Redeem => wrap(&h.redemptions, ContractEvent::Redeem),
            EventKind::RegularFeePaid => wrap(&h.regular_fees, ContractEvent::RegularFeePaid),
            EventKind::FinalFeePaid => wrap(&h.final_fees, ContractEvent::FinalFeePaid),
            EventKind::LiquidationWithdrawn => {
                wrap(&h.liquidation_withdrawals, ContractEvent::LiquidationWithdrawn)
            }
            EventKind::SettleExpiredPosition => {
                wrap(&h.expired_settlements, ContractEvent::SettleExpiredPosition)
            }
        }
    }
}

/// Decode a pass into typed records. `NewSponsor` logs come back separately,
/// still awaiting correlation.
fn decode_batch(
    fetched: Vec<(EventKind, Vec<Log>)>,
) -> Result<(Histories, Vec<EventRecord<NewSponsorLog>>), SentinelError> {
    let mut batch = Histories::default();
    let mut sponsor_logs = Vec::new();

    for (kind, logs) in fetched {
        for log in &logs {
            let decoded = decode_log(kind, log).map_err(|cause| SentinelError::Decode {
                kind,
                transaction_hash: log.transaction_hash,
                cause,
            })?;
            match decoded {
                DecodedLog::Event(event) => batch.push(event),
                DecodedLog::NewSponsor(record) => sponsor_logs.push(record),
            }
        }
    }

    Ok((batch, sponsor_logs))
}

fn timestamp(value: U256) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(u64::try_from(value).ok()?).ok()?;
    DateTime::from_timestamp(secs, 0)
}
