//! Idempotent ERC-20 approval upkeep.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::{debug, info};

use sentinel_chain::{ChainTransport, ContractCall, TransactionCall, TransactionReceipt};
use sentinel_common::SentinelError;

/// One `(owner, spender, token)` triple the bot keeps approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowanceTarget {
    pub owner: Address,
    pub spender: Address,
    pub token: Address,
}

/// Below this the allowance is topped back up to `U256::MAX`.
fn approval_threshold() -> U256 {
    U256::MAX / U256::from(2u8)
}

pub struct AllowanceManager {
    transport: Arc<dyn ChainTransport>,
}

impl AllowanceManager {
    pub fn new(transport: Arc<dyn ChainTransport>) -> Self {
        Self { transport }
    }

    /// Approve `spender` for the maximum amount of `token` unless at least half
    /// of that is still available. Returns the receipt when a transaction was sent.
    ///
    /// The approval is sent from the transport's account, which must be `owner`.
    pub async fn ensure_allowance(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
    ) -> Result<Option<TransactionReceipt>, SentinelError> {
        let current = self
            .transport
            .read_contract_value(ContractCall::Allowance { token, owner, spender })
            .await
            .and_then(|v| v.as_uint())
            .map_err(|e| SentinelError::rpc(format!("allowance({token}, {owner}, {spender})"), e))?;

        if current >= approval_threshold() {
            debug!(%token, %spender, "Allowance sufficient");
            return Ok(None);
        }

        let receipt = self
            .transport
            .submit_transaction(TransactionCall::Approve {
                token,
                spender,
                amount: U256::MAX,
            })
            .await
            .map_err(|e| SentinelError::TransactionFailed {
                transaction_hash: None,
                reason: format!("approve {spender} on {token}: {e:#}"),
            })?;

        if !receipt.success {
            return Err(SentinelError::TransactionFailed {
                transaction_hash: Some(receipt.transaction_hash),
                reason: format!("approve {spender} on {token} reverted"),
            });
        }

        info!(
            %token,
            %spender,
            tx = %receipt.transaction_hash,
            "Approved allowance"
        );
        Ok(Some(receipt))
    }

    pub async fn ensure_all(&self, targets: &[AllowanceTarget]) -> Result<(), SentinelError> {
        for target in targets {
            self.ensure_allowance(target.owner, target.spender, target.token)
                .await?;
        }
        Ok(())
    }
}
