//! # Bid Ingestion
//!
//! Keeps the local auction state in step with the contract. Three paths feed
//! the store:
//!
//! - a catch-up scan that walks the bid history when a session starts, and
//!   the same scan resumed from the highest known index on periodic refresh;
//! - `NewBid` events, which carry the full record and are applied directly;
//! - `DataUpdated` events, whose ids are queued and re-read in small batches.
//!
//! Each logical fact is folded into the store exactly once, keyed by its
//! [`auction_types::EventId`].

use auction_chain::ChainError;
use auction_state::StateError;
use thiserror::Error;

pub mod pipeline;

pub use pipeline::{BidIngestionPipeline, IngestionSettings, ScanReport};

#[derive(Debug, Error)]
pub enum DiscoveryError {
	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),
	#[error("Refresh queue error: {0}")]
	Queue(#[from] StateError),
}
