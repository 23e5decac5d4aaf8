//! Chain access for the sentinel.
//!
//! `ChainTransport` is the single seam between the bot and a node: block
//! height, past logs, contract reads, transaction submission. `RpcTransport`
//! talks to a real node through an alloy provider; `MockTransport` (feature
//! `test-utils`) is an in-memory chain for tests. `contract` holds the `sol!`
//! bindings and turns logs into typed records.

pub mod contract;
pub mod rpc;
pub mod traits;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use contract::{decode_log, event_signature, DecodedLog};
pub use rpc::RpcTransport;
pub use traits::{ChainTransport, ContractCall, ContractValue, TransactionCall, TransactionReceipt};
