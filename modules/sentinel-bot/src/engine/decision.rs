use alloy_primitives::Address;
use async_trait::async_trait;

use sentinel_common::Price;
use sentinel_events::EventCache;

/// What an engine sees during one iteration.
pub struct MarketView<'a> {
    pub events: &'a EventCache,
    /// `None` when the price feed has no price this iteration.
    pub price: Option<Price>,
    /// The bot's acting account.
    pub account: Address,
}

/// Decides which liquidations, disputes and withdrawals to submit.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn evaluate_and_act(&self, view: &MarketView<'_>) -> anyhow::Result<()>;

    /// Withdraw rewards from settled liquidations. Runs after `evaluate_and_act`.
    async fn claim_rewards(&self, view: &MarketView<'_>) -> anyhow::Result<()>;
}
