//! Result types for the event cache.

use serde::{Deserialize, Serialize};

/// Outcome of one successful `EventCache::synchronize` pass.
///
/// When the chain had no new blocks, `to_block` is below `from_block` and
/// nothing was scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub from_block: u64,
    pub to_block: u64,
    /// Records appended across all kinds, correlated `NewSponsor`s included.
    pub appended: usize,
}

impl SyncReport {
    pub fn scanned(&self) -> bool {
        self.to_block >= self.from_block
    }
}
