pub mod types;
pub mod events;
pub mod config;
pub mod error;

pub use types::*;
pub use events::*;
pub use config::{Config, LogFormat};
pub use error::SentinelError;

pub use alloy_primitives::{Address, B256, U256};
