//! The decision-engine seam.
//!
//! The loop hands each engine a read-only `MarketView` once per iteration.
//! Profitability math lives behind this trait; the built-in `ObserverEngine`
//! only reports what it sees.

pub mod decision;
pub mod observer;

pub use decision::{DecisionEngine, MarketView};
pub use observer::{ObserverConfig, ObserverEngine};

use serde_json::Value;
use tracing::info;

use sentinel_common::SentinelError;

/// Build the engine selected by `LIQUIDATOR_CONFIG`. Absent or `null` selects
/// the observer with default settings.
pub fn create_decision_engine(
    config: Option<&Value>,
) -> Result<Box<dyn DecisionEngine>, SentinelError> {
    let config = match config {
        None | Some(Value::Null) => ObserverConfig::default(),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| SentinelError::Config(format!("invalid LIQUIDATOR_CONFIG: {e}")))?,
    };
    info!(verbose = config.verbose, "Using observer decision engine");
    Ok(Box::new(ObserverEngine::new(config)))
}
