//! ChainTransport over an alloy HTTP provider.

use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::sol_types::SolCall;
use alloy::transports::http::Http;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use sentinel_common::EventKind;

use crate::contract::{event_signature, ExpiringMultiParty, IERC20};
use crate::traits::{ChainTransport, ContractCall, ContractValue, TransactionCall, TransactionReceipt};

/// Per-request HTTP timeout. A hung node surfaces as a transient RPC error.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// How long a submitted transaction may take to be mined.
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Production transport: one contract, one node-managed sending account.
pub struct RpcTransport {
    provider: DynProvider,
    contract: Address,
    account: Address,
}

impl RpcTransport {
    pub fn new(rpc_url: &str, contract: Address, account: Address) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {rpc_url}"))?;
        let client = RpcClient::new(Http::with_client(http, url), false);
        let provider = ProviderBuilder::new().connect_client(client).erased();

        Ok(Self {
            provider,
            contract,
            account,
        })
    }

    async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let request = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());
        let output = self
            .provider
            .call(request)
            .await
            .with_context(|| format!("eth_call {} on {to}", C::SIGNATURE))?;
        C::abi_decode_returns(&output)
            .with_context(|| format!("Malformed {} return value", C::SIGNATURE))
    }
}

#[async_trait]
impl ChainTransport for RpcTransport {
    async fn current_block_height(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn past_events(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(self.contract)
            .event_signature(event_signature(kind))
            .from_block(from_block)
            .to_block(to_block);
        let logs = self.provider.get_logs(&filter).await?;

        let mut mined = Vec::with_capacity(logs.len());
        for log in logs {
            if log.removed {
                warn!(%kind, tx = ?log.transaction_hash, "Skipping removed log");
                continue;
            }
            mined.push(log);
        }

        debug!(%kind, from_block, to_block, count = mined.len(), "Fetched logs");
        Ok(mined)
    }

    async fn submit_transaction(&self, call: TransactionCall) -> Result<TransactionReceipt> {
        let (to, input) = match &call {
            TransactionCall::Approve {
                token,
                spender,
                amount,
            } => (
                *token,
                IERC20::approveCall {
                    spender: *spender,
                    amount: *amount,
                }
                .abi_encode(),
            ),
        };
        let request = TransactionRequest::default()
            .with_from(self.account)
            .with_to(to)
            .with_input(input);

        let pending = self.provider.send_transaction(request).await?;
        info!(%call, tx = %pending.tx_hash(), "Submitted transaction");

        let receipt = pending
            .with_timeout(Some(RECEIPT_TIMEOUT))
            .get_receipt()
            .await
            .with_context(|| format!("{call} was not confirmed"))?;

        Ok(TransactionReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt
                .block_number
                .context("receipt has no block number")?,
            success: receipt.status(),
        })
    }

    async fn read_contract_value(&self, call: ContractCall) -> Result<ContractValue> {
        Ok(match call {
            ContractCall::CurrentTime => ContractValue::Uint(
                self.call(self.contract, ExpiringMultiParty::getCurrentTimeCall {})
                    .await?,
            ),
            ContractCall::CollateralCurrency => ContractValue::Address(
                self.call(self.contract, ExpiringMultiParty::collateralCurrencyCall {})
                    .await?,
            ),
            ContractCall::TokenCurrency => ContractValue::Address(
                self.call(self.contract, ExpiringMultiParty::tokenCurrencyCall {})
                    .await?,
            ),
            ContractCall::Allowance {
                token,
                owner,
                spender,
            } => ContractValue::Uint(self.call(token, IERC20::allowanceCall { owner, spender }).await?),
        })
    }
}
