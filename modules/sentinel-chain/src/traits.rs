//! Core traits and call types for chain access.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use anyhow::{bail, Result};
use async_trait::async_trait;

use sentinel_common::EventKind;

/// Read-only calls the bot makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractCall {
    /// `getCurrentTime()` on the monitored contract.
    CurrentTime,
    /// `collateralCurrency()` on the monitored contract.
    CollateralCurrency,
    /// `tokenCurrency()` on the monitored contract.
    TokenCurrency,
    /// ERC-20 `allowance(owner, spender)` on `token`.
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
    },
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentTime => write!(f, "getCurrentTime"),
            Self::CollateralCurrency => write!(f, "collateralCurrency"),
            Self::TokenCurrency => write!(f, "tokenCurrency"),
            Self::Allowance { token, .. } => write!(f, "allowance@{token}"),
        }
    }
}

/// State-changing calls. Sent from the transport's acting account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionCall {
    /// ERC-20 `approve(spender, amount)` on `token`.
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
}

impl fmt::Display for TransactionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve { token, .. } => write!(f, "approve@{token}"),
        }
    }
}

/// Decoded return value of a [`ContractCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractValue {
    Uint(U256),
    Address(Address),
}

impl ContractValue {
    pub fn as_uint(&self) -> Result<U256> {
        match self {
            Self::Uint(v) => Ok(*v),
            Self::Address(a) => bail!("expected uint256, got address {a}"),
        }
    }

    pub fn as_address(&self) -> Result<Address> {
        match self {
            Self::Address(a) => Ok(*a),
            Self::Uint(v) => bail!("expected address, got uint256 {v}"),
        }
    }
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
}

/// Everything the bot needs from a node, scoped to one contract and one account.
///
/// Implemented by RpcTransport (JSON-RPC) and MockTransport (tests).
/// Also implemented for `Arc<T>` so tests can keep a handle for assertions.
#[async_trait]
pub trait ChainTransport: Send + Sync {
    /// Latest block number.
    async fn current_block_height(&self) -> Result<u64>;

    /// Mined logs of `kind` emitted by the contract in `[from_block, to_block]`,
    /// both inclusive, in chain order. Still ABI-encoded.
    async fn past_events(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>>;

    /// Submit and wait for the receipt. A revert is reported through
    /// `TransactionReceipt::success`, not as an error.
    async fn submit_transaction(&self, call: TransactionCall) -> Result<TransactionReceipt>;

    async fn read_contract_value(&self, call: ContractCall) -> Result<ContractValue>;
}

// ---------------------------------------------------------------------------
// Arc<T> blanket impl
// ---------------------------------------------------------------------------

#[async_trait]
impl<T: ChainTransport + ?Sized> ChainTransport for Arc<T> {
    async fn current_block_height(&self) -> Result<u64> {
        (**self).current_block_height().await
    }

    async fn past_events(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>> {
        (**self).past_events(kind, from_block, to_block).await
    }

    async fn submit_transaction(&self, call: TransactionCall) -> Result<TransactionReceipt> {
        (**self).submit_transaction(call).await
    }

    async fn read_contract_value(&self, call: ContractCall) -> Result<ContractValue> {
        (**self).read_contract_value(call).await
    }
}
