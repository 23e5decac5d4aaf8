//! Setup: turn a `Config` and a transport into a ready `ActionLoop`.

use std::sync::Arc;

use tracing::{error, info};

use sentinel_chain::{ChainTransport, ContractCall};
use sentinel_common::{Address, Config, SentinelError};
use sentinel_events::EventCache;

use crate::action_loop::ActionLoop;
use crate::allowance::{AllowanceManager, AllowanceTarget};
use crate::engine::create_decision_engine;
use crate::price_feed::create_price_feed;

/// Build the loop. Every error here is fatal and is returned before the loop runs.
pub async fn build_action_loop(
    config: &Config,
    transport: Arc<dyn ChainTransport>,
) -> Result<ActionLoop, SentinelError> {
    let result = build(config, transport).await;
    if let Err(e) = &result {
        error!(error = %e, contract = %config.contract_address, "Failed to set up action loop");
    }
    result
}

async fn build(
    config: &Config,
    transport: Arc<dyn ChainTransport>,
) -> Result<ActionLoop, SentinelError> {
    let price_feed = create_price_feed(&config.price_feed_config)?;
    let engine = create_decision_engine(config.engine_config.as_ref())?;

    let collateral = read_address(transport.as_ref(), ContractCall::CollateralCurrency).await?;
    let synthetic = read_address(transport.as_ref(), ContractCall::TokenCurrency).await?;
    info!(%collateral, %synthetic, "Loaded contract currencies");

    let targets: Vec<AllowanceTarget> = [collateral, synthetic]
        .into_iter()
        .map(|token| AllowanceTarget {
            owner: config.account,
            spender: config.contract_address,
            token,
        })
        .collect();

    let cache = EventCache::new(
        transport.clone(),
        config.contract_address,
        config.starting_block,
    );

    Ok(ActionLoop::new(
        cache,
        AllowanceManager::new(transport),
        price_feed,
        engine,
        config.account,
    )
    .with_targets(targets)
    .with_polling_delay(config.polling_delay)
    .with_retries(config.error_retries, config.error_retries_timeout))
}

async fn read_address(
    transport: &dyn ChainTransport,
    call: ContractCall,
) -> Result<Address, SentinelError> {
    transport
        .read_contract_value(call)
        .await
        .and_then(|v| v.as_address())
        .map_err(|e| SentinelError::rpc(call.to_string(), e))
}
