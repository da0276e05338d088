//! Chain notifications consumed by the ingestion pipeline.

use alloy::primitives::B256;
use std::fmt;

use crate::BidRecord;

/// Stable identifier of an observed on-chain fact.
///
/// Log-delivered events are keyed by transaction hash and log index, which is
/// unique per emitted event regardless of which path observed it. Records read
/// directly from the bid history carry no transaction identity and are keyed
/// by their history index instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventId {
	Log { tx_hash: B256, log_index: u64 },
	BidIndex(u64),
}

impl fmt::Display for EventId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EventId::Log { tx_hash, log_index } => write!(f, "{}:{}", tx_hash, log_index),
			EventId::BidIndex(index) => write!(f, "bid#{}", index),
		}
	}
}

/// Typed notification produced by the chain subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
	/// A `NewBid` log. The log carries the full record so no read is needed.
	NewBid { id: EventId, record: BidRecord },
	/// A `DataUpdated` log carrying an opaque identifier that needs a refresh.
	DataUpdated { id: EventId, data_id: u64 },
}

impl ChainEvent {
	pub fn id(&self) -> EventId {
		match self {
			ChainEvent::NewBid { id, .. } | ChainEvent::DataUpdated { id, .. } => *id,
		}
	}
}
