//! Core types for state management.

use auction_types::Address;

/// Result of folding a bid record into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
	/// The event id was already processed; nothing changed.
	Duplicate,
	/// The record is older than the current one. It was kept in history but
	/// the projection is unchanged.
	Stored,
	/// The record became the current bid.
	Advanced {
		/// Whether the current bidder differs from the previous one.
		bidder_changed: bool,
		/// Bidder of the new current record.
		bidder: Address,
	},
}

impl ApplyOutcome {
	/// True when the current-bid projection was overwritten.
	pub fn advanced(&self) -> bool {
		matches!(self, ApplyOutcome::Advanced { .. })
	}
}

/// State management errors
#[derive(Debug, thiserror::Error)]
pub enum StateError {
	#[error("Queue is full ({0} pending)")]
	QueueFull(usize),
}
