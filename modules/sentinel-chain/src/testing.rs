// Test double for the chain.
//
// MockTransport is an in-memory chain: a settable block height, per-kind
// logs filtered by block range, an ERC-20 allowance table that `Approve`
// updates, a contract clock, and failure injection for every entry point.
// It records every query and submission so tests can assert on them.
//
// Plus fixture helpers that ABI-encode a log of each kind.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{address, Address, LogData, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use anyhow::{bail, Result};
use async_trait::async_trait;

use sentinel_common::EventKind;

use crate::contract::ExpiringMultiParty as emp;
use crate::traits::{ChainTransport, ContractCall, ContractValue, TransactionCall, TransactionReceipt};

/// One `past_events` call as seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQuery {
    pub kind: EventKind,
    pub from_block: u64,
    pub to_block: u64,
}

struct MockState {
    height: u64,
    current_time: u64,
    collateral_currency: Address,
    token_currency: Address,
    events: HashMap<EventKind, Vec<Log>>,
    allowances: HashMap<(Address, Address, Address), U256>,
    submitted: Vec<TransactionCall>,
    queries: Vec<EventQuery>,
    height_failures: u32,
    event_failures: u32,
    read_failures: u32,
    revert_transactions: bool,
    next_tx: u64,
}

/// In-memory chain. Builder pattern: `.with_height()`, `.with_event()`, …
pub struct MockTransport {
    account: Address,
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            state: Mutex::new(MockState {
                height: 0,
                current_time: 0,
                collateral_currency: Address::repeat_byte(0xc0),
                token_currency: Address::repeat_byte(0x70),
                events: HashMap::new(),
                allowances: HashMap::new(),
                submitted: Vec::new(),
                queries: Vec::new(),
                height_failures: 0,
                event_failures: 0,
                read_failures: 0,
                revert_transactions: false,
                next_tx: 1,
            }),
        }
    }

    pub fn with_height(self, height: u64) -> Self {
        self.set_height(height);
        self
    }

    pub fn with_time(self, unix_seconds: u64) -> Self {
        self.set_time(unix_seconds);
        self
    }

    pub fn with_event(self, kind: EventKind, event: Log) -> Self {
        self.push_event(kind, event);
        self
    }

    pub fn with_allowance(self, token: Address, owner: Address, spender: Address, amount: U256) -> Self {
        self.state().allowances.insert((token, owner, spender), amount);
        self
    }

    pub fn with_currencies(self, collateral: Address, token: Address) -> Self {
        {
            let mut state = self.state();
            state.collateral_currency = collateral;
            state.token_currency = token;
        }
        self
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn set_height(&self, height: u64) {
        self.state().height = height;
    }

    pub fn set_time(&self, unix_seconds: u64) {
        self.state().current_time = unix_seconds;
    }

    /// Append a log. Callers keep per-kind logs in chain order.
    pub fn push_event(&self, kind: EventKind, event: Log) {
        self.state().events.entry(kind).or_default().push(event);
    }

    /// Make the next `n` block-height queries fail.
    pub fn fail_height_queries(&self, n: u32) {
        self.state().height_failures = n;
    }

    /// Make the next `n` event queries fail.
    pub fn fail_event_queries(&self, n: u32) {
        self.state().event_failures = n;
    }

    /// Make the next `n` contract reads fail.
    pub fn fail_reads(&self, n: u32) {
        self.state().read_failures = n;
    }

    /// Mine every subsequent transaction as reverted.
    pub fn revert_transactions(&self, revert: bool) {
        self.state().revert_transactions = revert;
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn submitted(&self) -> Vec<TransactionCall> {
        self.state().submitted.clone()
    }

    pub fn queries(&self) -> Vec<EventQuery> {
        self.state().queries.clone()
    }

    /// Distinct `[from, to]` ranges queried, in order.
    pub fn scanned_ranges(&self) -> Vec<(u64, u64)> {
        let mut ranges: Vec<(u64, u64)> = Vec::new();
        for q in self.state().queries.iter() {
            let range = (q.from_block, q.to_block);
            if ranges.last() != Some(&range) {
                ranges.push(range);
            }
        }
        ranges
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ChainTransport for MockTransport {
    async fn current_block_height(&self) -> Result<u64> {
        let mut state = self.state();
        if state.height_failures > 0 {
            state.height_failures -= 1;
            bail!("MockTransport: injected block height failure");
        }
        Ok(state.height)
    }

    async fn past_events(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>> {
        let mut state = self.state();
        state.queries.push(EventQuery { kind, from_block, to_block });
        if state.event_failures > 0 {
            state.event_failures -= 1;
            bail!("MockTransport: injected {kind} query failure");
        }
        Ok(state
            .events
            .get(&kind)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| {
                        e.block_number
                            .is_some_and(|block| block >= from_block && block <= to_block)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn submit_transaction(&self, call: TransactionCall) -> Result<TransactionReceipt> {
        let mut state = self.state();
        let n = state.next_tx;
        state.next_tx += 1;
        state.submitted.push(call.clone());

        let success = !state.revert_transactions;
        if success {
            let TransactionCall::Approve { token, spender, amount } = call;
            state.allowances.insert((token, self.account, spender), amount);
        }

        Ok(TransactionReceipt {
            transaction_hash: tx_hash(n),
            block_number: state.height,
            success,
        })
    }

    async fn read_contract_value(&self, call: ContractCall) -> Result<ContractValue> {
        let mut state = self.state();
        if state.read_failures > 0 {
            state.read_failures -= 1;
            bail!("MockTransport: injected {call} read failure");
        }
        Ok(match call {
            ContractCall::CurrentTime => ContractValue::Uint(U256::from(state.current_time)),
            ContractCall::CollateralCurrency => ContractValue::Address(state.collateral_currency),
            ContractCall::TokenCurrency => ContractValue::Address(state.token_currency),
            ContractCall::Allowance { token, owner, spender } => ContractValue::Uint(
                state
                    .allowances
                    .get(&(token, owner, spender))
                    .copied()
                    .unwrap_or(U256::ZERO),
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Address every fixture log is emitted from.
pub const FIXTURE_CONTRACT: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// Deterministic transaction hash for fixture number `n`.
pub fn tx_hash(n: u64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&n.to_be_bytes());
    B256::from(bytes)
}

fn amount(value: &str) -> U256 {
    value.parse().expect("fixture amount must be a decimal integer")
}

/// A mined log carrying `data`.
pub fn mined_log(block: u64, tx: u64, data: LogData) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: FIXTURE_CONTRACT,
            data,
        },
        block_number: Some(block),
        transaction_hash: Some(tx_hash(tx)),
        log_index: Some(0),
        ..Default::default()
    }
}

fn encoded<E: SolEvent>(block: u64, tx: u64, event: E) -> Log {
    mined_log(block, tx, event.encode_log_data())
}

/// A log whose topics match no event of the contract.
pub fn malformed_log(block: u64, tx: u64) -> Log {
    mined_log(block, tx, LogData::new_unchecked(vec![B256::repeat_byte(0x99)], Default::default()))
}

pub fn position_created(block: u64, tx: u64, sponsor: Address, collateral: &str, tokens: &str) -> Log {
    encoded(
        block,
        tx,
        emp::PositionCreated {
            sponsor,
            collateralAmount: amount(collateral),
            tokenAmount: amount(tokens),
        },
    )
}

pub fn new_sponsor(block: u64, tx: u64, sponsor: Address) -> Log {
    encoded(block, tx, emp::NewSponsor { sponsor })
}

pub fn deposit(block: u64, tx: u64, sponsor: Address, collateral: &str) -> Log {
    encoded(
        block,
        tx,
        emp::Deposit {
            sponsor,
            collateralAmount: amount(collateral),
        },
    )
}

pub fn withdrawal(block: u64, tx: u64, sponsor: Address, collateral: &str) -> Log {
    encoded(
        block,
        tx,
        emp::Withdrawal {
            sponsor,
            collateralAmount: amount(collateral),
        },
    )
}

pub fn redeem(block: u64, tx: u64, sponsor: Address, collateral: &str, tokens: &str) -> Log {
    encoded(
        block,
        tx,
        emp::Redeem {
            sponsor,
            collateralAmount: amount(collateral),
            tokenAmount: amount(tokens),
        },
    )
}

pub fn liquidation_created(
    block: u64,
    tx: u64,
    sponsor: Address,
    liquidator: Address,
    liquidation_id: u64,
) -> Log {
    encoded(
        block,
        tx,
        emp::LiquidationCreated {
            sponsor,
            liquidator,
            liquidationId: U256::from(liquidation_id),
            tokensOutstanding: U256::from(100u64),
            lockedCollateral: U256::from(150u64),
            liquidatedCollateral: U256::from(150u64),
            liquidationTime: U256::from(1_600_000_000u64),
        },
    )
}

pub fn liquidation_disputed(
    block: u64,
    tx: u64,
    sponsor: Address,
    liquidator: Address,
    disputer: Address,
    liquidation_id: u64,
) -> Log {
    encoded(
        block,
        tx,
        emp::LiquidationDisputed {
            sponsor,
            liquidator,
            disputer,
            liquidationId: U256::from(liquidation_id),
            disputeBondAmount: U256::from(15u64),
        },
    )
}

pub fn dispute_settled(
    block: u64,
    tx: u64,
    sponsor: Address,
    liquidator: Address,
    disputer: Address,
    liquidation_id: u64,
    succeeded: bool,
) -> Log {
    encoded(
        block,
        tx,
        emp::DisputeSettled {
            caller: disputer,
            sponsor,
            liquidator,
            disputer,
            liquidationId: U256::from(liquidation_id),
            disputeSucceeded: succeeded,
        },
    )
}

pub fn liquidation_withdrawn(block: u64, tx: u64, caller: Address, withdrawn: &str, status: u8) -> Log {
    encoded(
        block,
        tx,
        emp::LiquidationWithdrawn {
            caller,
            withdrawalAmount: amount(withdrawn),
            liquidationStatus: status,
        },
    )
}

pub fn regular_fee_paid(block: u64, tx: u64, regular_fee: &str, late_fee: &str) -> Log {
    encoded(
        block,
        tx,
        emp::RegularFeesPaid {
            regularFee: amount(regular_fee),
            lateFee: amount(late_fee),
        },
    )
}

pub fn final_fee_paid(block: u64, tx: u64, fee: &str) -> Log {
    encoded(block, tx, emp::FinalFeesPaid { amount: amount(fee) })
}

pub fn settle_expired_position(block: u64, tx: u64, caller: Address, collateral: &str, tokens: &str) -> Log {
    encoded(
        block,
        tx,
        emp::SettleExpiredPosition {
            caller,
            collateralReturned: amount(collateral),
            tokensBurned: amount(tokens),
        },
    )
}
