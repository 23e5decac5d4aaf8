use alloy_primitives::{Address, B256};
use thiserror::Error;

use crate::events::EventKind;

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A `NewSponsor` log could not be paired with exactly one `PositionCreated`
    /// in the same block.
    #[error(
        "Consistency error: NewSponsor for {sponsor} in tx {transaction_hash} at block {block_number} \
         matched {matches} PositionCreated events (expected exactly 1)"
    )]
    Consistency {
        sponsor: Address,
        block_number: u64,
        transaction_hash: B256,
        matches: usize,
    },

    #[error("RPC error during {operation}: {cause:#}")]
    Rpc {
        operation: String,
        cause: anyhow::Error,
    },

    #[error("Transaction failed{}: {reason}", hash_suffix(.transaction_hash))]
    TransactionFailed {
        transaction_hash: Option<B256>,
        reason: String,
    },

    #[error("Malformed {kind} event{}: {cause:#}", hash_suffix(.transaction_hash))]
    Decode {
        kind: EventKind,
        transaction_hash: Option<B256>,
        cause: anyhow::Error,
    },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

fn hash_suffix(hash: &Option<B256>) -> String {
    hash.map(|h| format!(" ({h})")).unwrap_or_default()
}

impl SentinelError {
    pub fn rpc(operation: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::Rpc {
            operation: operation.into(),
            cause,
        }
    }

    /// Whether running the same step again can succeed. Transport hiccups and
    /// collaborator errors can; a revert, a broken correlation or a malformed
    /// log would only be repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc { .. } | Self::Anyhow(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_failure_mentions_hash_when_known() {
        let hash = B256::repeat_byte(0x01);
        let with_hash = SentinelError::TransactionFailed {
            transaction_hash: Some(hash),
            reason: "reverted".into(),
        };
        let without = SentinelError::TransactionFailed {
            transaction_hash: None,
            reason: "not confirmed".into(),
        };
        assert!(with_hash.to_string().contains(&hash.to_string()));
        assert_eq!(without.to_string(), "Transaction failed: not confirmed");
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(SentinelError::rpc("eth_blockNumber", anyhow::anyhow!("timeout")).is_retryable());
        assert!(SentinelError::from(anyhow::anyhow!("feed offline")).is_retryable());

        assert!(!SentinelError::Config("missing".into()).is_retryable());
        assert!(!SentinelError::TransactionFailed {
            transaction_hash: None,
            reason: "reverted".into(),
        }
        .is_retryable());
        assert!(!SentinelError::Consistency {
            sponsor: Address::repeat_byte(0x01),
            block_number: 81,
            transaction_hash: B256::repeat_byte(0x02),
            matches: 0,
        }
        .is_retryable());
        assert!(!SentinelError::Decode {
            kind: EventKind::Deposit,
            transaction_hash: None,
            cause: anyhow::anyhow!("bad topics"),
        }
        .is_retryable());
    }
}
