use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use sentinel_bot::{build_action_loop, LoopState, RunMode};
use sentinel_chain::testing::MockTransport;
use sentinel_common::{Config, SentinelError};

const CONTRACT: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
const ACCOUNT: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

fn config(overrides: &[(&str, &str)]) -> Result<Config, SentinelError> {
    let mut vars: HashMap<String, String> = [
        ("EMP_ADDRESS", CONTRACT),
        ("BOT_ACCOUNT", ACCOUNT),
        ("POLLING_DELAY", "0"),
        (
            "PRICE_FEED_CONFIG",
            r#"{"type":"constant","price":"1000000000000000000"}"#,
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(move |key: &str| vars.get(key).cloned())
}

fn chain() -> Arc<MockTransport> {
    Arc::new(
        MockTransport::new(Address::repeat_byte(0xaa))
            .with_currencies(Address::repeat_byte(0xc0), Address::repeat_byte(0x70))
            .with_height(20)
            .with_time(1_600_000_000),
    )
}

#[tokio::test]
async fn builds_loop_with_both_currency_allowances() {
    let config = config(&[("STARTING_BLOCK", "5")]).unwrap();
    let chain = chain();

    let action_loop = build_action_loop(&config, chain.clone()).await.unwrap();

    assert_eq!(action_loop.state(), LoopState::Initializing);
    assert_eq!(action_loop.mode(), RunMode::SingleShot);
    assert_eq!(action_loop.cache().cursor(), 5);
    assert_eq!(action_loop.cache().contract_address(), config.contract_address);

    let tokens: Vec<Address> = action_loop.targets().iter().map(|t| t.token).collect();
    assert_eq!(tokens, vec![Address::repeat_byte(0xc0), Address::repeat_byte(0x70)]);
    assert!(action_loop
        .targets()
        .iter()
        .all(|t| t.owner == config.account && t.spender == config.contract_address));
}

#[tokio::test]
async fn single_shot_run_approves_and_syncs() {
    let config = config(&[]).unwrap();
    let chain = chain();
    let mut action_loop = build_action_loop(&config, chain.clone()).await.unwrap();

    let report = action_loop.run().await;

    assert!(report.succeeded(), "{report}");
    assert_eq!(action_loop.cache().cursor(), 21);
    assert_eq!(chain.submitted().len(), 2);
    assert_eq!(
        chain.allowance(Address::repeat_byte(0x70), config.account, config.contract_address),
        U256::MAX
    );
}

#[tokio::test]
async fn continuous_mode_follows_polling_delay() {
    let config = config(&[("POLLING_DELAY", "5000")]).unwrap();
    let action_loop = build_action_loop(&config, chain()).await.unwrap();
    assert_eq!(action_loop.mode(), RunMode::Continuous);
}

#[tokio::test]
async fn bad_price_feed_is_config_error() {
    let config = config(&[("PRICE_FEED_CONFIG", r#"{"type":"coinbase"}"#)]).unwrap();
    let err = build_action_loop(&config, chain()).await.err().unwrap();
    assert!(matches!(err, SentinelError::Config(_)));
}

#[tokio::test]
async fn bad_engine_config_is_config_error() {
    let config = config(&[("LIQUIDATOR_CONFIG", r#"{"whaleDefenseFundWei":"1"}"#)]).unwrap();
    let err = build_action_loop(&config, chain()).await.err().unwrap();
    assert!(matches!(err, SentinelError::Config(_)));
}

#[tokio::test]
async fn unreadable_currency_fails_setup() {
    let config = config(&[]).unwrap();
    let chain = chain();
    chain.fail_reads(1);

    let err = build_action_loop(&config, chain).await.err().unwrap();
    assert!(matches!(err, SentinelError::Rpc { .. }));
}
