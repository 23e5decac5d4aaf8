//! Price feeds built from `PRICE_FEED_CONFIG`.
//!
//! Only `constant` leaves exist; a `medianizer` combines them. Exchange-backed
//! options such as `lookback` are accepted in the JSON and ignored.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use sentinel_common::{Price, Quantity, SentinelError, U256};

/// A source of the current price, refreshed once per iteration.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn update(&mut self) -> anyhow::Result<()>;

    /// Latest price, or `None` if the feed has none yet.
    fn current_price(&self) -> Option<Price>;
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum FeedConfig {
    Medianizer {
        #[serde(default)]
        pair: Option<String>,
        #[serde(rename = "medianizedFeeds")]
        medianized_feeds: Vec<Value>,
    },
    Constant {
        price: Quantity,
    },
}

/// Build a feed from its JSON configuration.
pub fn create_price_feed(config: &Value) -> Result<Box<dyn PriceFeed>, SentinelError> {
    if !config.is_object() {
        return Err(SentinelError::Config(format!(
            "price feed config must be a JSON object, got {config}"
        )));
    }

    let parsed: FeedConfig = serde_json::from_value(config.clone())
        .map_err(|e| SentinelError::Config(format!("invalid price feed config: {e}")))?;

    match parsed {
        FeedConfig::Constant { price } => {
            let raw = price.to_u256().ok_or_else(|| {
                SentinelError::Config(format!("constant price {price} does not fit in 256 bits"))
            })?;
            Ok(Box::new(ConstantFeed::new(Price::from_raw(raw))))
        }
        FeedConfig::Medianizer {
            pair,
            medianized_feeds,
        } => {
            if medianized_feeds.is_empty() {
                return Err(SentinelError::Config(
                    "medianizer requires at least one entry in medianizedFeeds".to_string(),
                ));
            }
            let feeds = medianized_feeds
                .iter()
                .map(create_price_feed)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(MedianizerFeed { pair, feeds }))
        }
    }
}

// ---------------------------------------------------------------------------
// ConstantFeed
// ---------------------------------------------------------------------------

pub struct ConstantFeed {
    price: Price,
}

impl ConstantFeed {
    pub fn new(price: Price) -> Self {
        Self { price }
    }
}

#[async_trait]
impl PriceFeed for ConstantFeed {
    async fn update(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn current_price(&self) -> Option<Price> {
        Some(self.price)
    }
}

// ---------------------------------------------------------------------------
// MedianizerFeed
// ---------------------------------------------------------------------------

/// Median over child feeds. No price unless every child has one.
/// `pair` only labels the feed in logs.
pub struct MedianizerFeed {
    pair: Option<String>,
    feeds: Vec<Box<dyn PriceFeed>>,
}

impl MedianizerFeed {
    pub fn new(feeds: Vec<Box<dyn PriceFeed>>) -> Self {
        Self { pair: None, feeds }
    }
}

#[async_trait]
impl PriceFeed for MedianizerFeed {
    async fn update(&mut self) -> anyhow::Result<()> {
        try_join_all(self.feeds.iter_mut().map(|feed| feed.update())).await?;
        debug!(
            pair = self.pair.as_deref().unwrap_or("unknown"),
            feeds = self.feeds.len(),
            price = ?self.current_price().map(|p| p.to_string()),
            "Updated medianizer"
        );
        Ok(())
    }

    fn current_price(&self) -> Option<Price> {
        let prices = self
            .feeds
            .iter()
            .map(|feed| feed.current_price())
            .collect::<Option<Vec<Price>>>()?;
        median(prices)
    }
}

fn median(mut prices: Vec<Price>) -> Option<Price> {
    if prices.is_empty() {
        return None;
    }
    prices.sort();
    let mid = prices.len() / 2;
    if prices.len() % 2 == 1 {
        Some(prices[mid])
    } else {
        let (low, high) = (prices[mid - 1].raw(), prices[mid].raw());
        // Halve before adding so two large prices cannot overflow.
        let sum_halves = low / U256::from(2u8) + high / U256::from(2u8);
        let carry = (low % U256::from(2u8) + high % U256::from(2u8)) / U256::from(2u8);
        Some(Price::from_raw(sum_halves + carry))
    }
}
