//! The sentinel bot: allowance upkeep, price feeds, the decision-engine seam,
//! and the polling loop that drives them around an `EventCache`.

pub mod action_loop;
pub mod allowance;
pub mod bot;
pub mod engine;
pub mod price_feed;
pub mod types;

pub use action_loop::ActionLoop;
pub use allowance::{AllowanceManager, AllowanceTarget};
pub use bot::build_action_loop;
pub use engine::{create_decision_engine, DecisionEngine, MarketView};
pub use price_feed::{create_price_feed, PriceFeed};
pub use types::{IterationFailure, LoopState, RunMode, RunReport, Step};
