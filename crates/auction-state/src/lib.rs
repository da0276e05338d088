//! Local auction state for the bid client.
//!
//! Holds the projection of the latest bid, the bid history seen so far, the
//! per-address contribution ledger, display names and the set of processed
//! event ids, plus the queue of bid indices waiting to be re-read.

pub mod queue;
pub mod store;
pub mod types;

pub use queue::PendingIndexQueue;
pub use store::AuctionStateStore;
pub use types::{ApplyOutcome, StateError};
