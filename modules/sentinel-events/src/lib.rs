//! Incremental, in-memory history of one contract's events.
//!
//! `EventCache` scans the chain forward from a cursor, keeps one append-only
//! sequence per event kind, and pairs every `NewSponsor` log with the
//! `PositionCreated` emitted in the same block. Consumers only ever see
//! immutable snapshots.

pub mod cache;
pub mod correlate;
pub mod types;

pub use cache::EventCache;
pub use correlate::correlate_new_sponsors;
pub use types::SyncReport;
