use std::collections::HashSet;

use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use sentinel_common::{DisputeSettled, EventRecord, LiquidationCreated, LiquidationDisputed};
use sentinel_events::EventCache;

use super::decision::{DecisionEngine, MarketView};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObserverConfig {
    /// Log every liquidation and dispute, not just the counts.
    #[serde(default)]
    pub verbose: bool,
}

/// Engine that never transacts. Reports what a liquidator would act on.
pub struct ObserverEngine {
    config: ObserverConfig,
}

impl ObserverEngine {
    pub fn new(config: ObserverConfig) -> Self {
        Self { config }
    }
}

/// A liquidation is identified by its sponsor and per-sponsor id.
type LiquidationKey<'a> = (Address, &'a str);

/// Liquidations created and not disputed.
pub fn open_liquidations(events: &EventCache) -> Vec<&EventRecord<LiquidationCreated>> {
    let disputed: HashSet<LiquidationKey> = events
        .all_dispute_events()
        .iter()
        .map(|d| (d.payload.sponsor, d.payload.liquidation_id.as_str()))
        .collect();

    events
        .all_liquidation_events()
        .iter()
        .filter(|l| !disputed.contains(&(l.payload.sponsor, l.payload.liquidation_id.as_str())))
        .collect()
}

/// Disputes raised and not yet settled.
pub fn pending_disputes(events: &EventCache) -> Vec<&EventRecord<LiquidationDisputed>> {
    let settled: HashSet<LiquidationKey> = events
        .all_dispute_settlement_events()
        .iter()
        .map(|s| (s.payload.sponsor, s.payload.liquidation_id.as_str()))
        .collect();

    events
        .all_dispute_events()
        .iter()
        .filter(|d| !settled.contains(&(d.payload.sponsor, d.payload.liquidation_id.as_str())))
        .collect()
}

/// Settled disputes in which `account` was the liquidator or the disputer.
pub fn reward_candidates(events: &EventCache, account: Address) -> Vec<&EventRecord<DisputeSettled>> {
    events
        .all_dispute_settlement_events()
        .iter()
        .filter(|s| s.payload.liquidator == account || s.payload.disputer == account)
        .collect()
}

#[async_trait]
impl DecisionEngine for ObserverEngine {
    async fn evaluate_and_act(&self, view: &MarketView<'_>) -> anyhow::Result<()> {
        let Some(price) = view.price else {
            warn!(
                contract = %view.events.contract_address(),
                "No price available, skipping evaluation"
            );
            return Ok(());
        };

        let open = open_liquidations(view.events);
        let pending = pending_disputes(view.events);
        info!(
            %price,
            positions = view.events.all_create_events().len(),
            open_liquidations = open.len(),
            pending_disputes = pending.len(),
            "Market snapshot"
        );

        if self.config.verbose {
            for l in &open {
                info!(
                    sponsor = %l.payload.sponsor,
                    liquidation_id = l.payload.liquidation_id.as_str(),
                    liquidator = %l.payload.liquidator,
                    block = l.block_number,
                    "Open liquidation"
                );
            }
            for d in &pending {
                info!(
                    sponsor = %d.payload.sponsor,
                    liquidation_id = d.payload.liquidation_id.as_str(),
                    disputer = %d.payload.disputer,
                    block = d.block_number,
                    "Pending dispute"
                );
            }
        }
        Ok(())
    }

    async fn claim_rewards(&self, view: &MarketView<'_>) -> anyhow::Result<()> {
        let candidates = reward_candidates(view.events, view.account);
        if candidates.is_empty() {
            return Ok(());
        }

        info!(
            account = %view.account,
            candidates = candidates.len(),
            "Settled liquidations with rewards to withdraw"
        );
        if self.config.verbose {
            for s in &candidates {
                info!(
                    sponsor = %s.payload.sponsor,
                    liquidation_id = s.payload.liquidation_id.as_str(),
                    dispute_succeeded = s.payload.dispute_succeeded,
                    "Reward candidate"
                );
            }
        }
        Ok(())
    }
}
