//! Canonical locally known auction state.
//!
//! Every mutation of the bid projection goes through [`AuctionStateStore::apply_bid`],
//! which checks the processed-event set, records the bid, raises the ledger
//! and advances the projection under one write guard. Readers either see the
//! state before or after a whole apply, never part of one.

use crate::types::ApplyOutcome;
use auction_types::{Address, AuctionSnapshot, BidRecord, EventId, U256};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Default)]
struct StoreInner {
	history: BTreeMap<u64, BidRecord>,
	current: Option<BidRecord>,
	processed: HashSet<EventId>,
	contributions: HashMap<Address, U256>,
	deadline: Option<u64>,
}

/// Auction state shared by the ingestion pipeline, the submission coordinator
/// and the presentation side.
#[derive(Default)]
pub struct AuctionStateStore {
	inner: RwLock<StoreInner>,
	/// Resolved display names. `None` records a lookup that found no name.
	display_names: DashMap<Address, Option<String>>,
}

impl AuctionStateStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Folds a bid record into the state exactly once per `event_id`.
	///
	/// The projection only moves forward: a record whose index is below the
	/// current one is kept in history but does not replace the current bid.
	pub async fn apply_bid(&self, record: BidRecord, event_id: EventId) -> ApplyOutcome {
		let mut inner = self.inner.write().await;

		if !inner.processed.insert(event_id) {
			debug!(%event_id, "Skipping already processed event");
			return ApplyOutcome::Duplicate;
		}

		let ledger = inner.contributions.entry(record.sender).or_default();
		if record.amount > *ledger {
			*ledger = record.amount;
		}

		let advances = inner
			.current
			.as_ref()
			.map_or(true, |current| record.index >= current.index);

		inner.history.insert(record.index, record.clone());

		if !advances {
			debug!(index = record.index, "Stored older bid record");
			return ApplyOutcome::Stored;
		}

		let bidder = record.sender;
		let bidder_changed = inner
			.current
			.as_ref()
			.map_or(true, |current| current.sender != bidder);

		info!(
			index = record.index,
			bidder = %bidder,
			amount = %record.amount,
			"Current bid updated"
		);
		inner.current = Some(record);

		ApplyOutcome::Advanced {
			bidder_changed,
			bidder,
		}
	}

	/// Cumulative amount `address` is known to have sent, zero if unseen.
	pub async fn get_contribution(&self, address: Address) -> U256 {
		self.inner
			.read()
			.await
			.contributions
			.get(&address)
			.copied()
			.unwrap_or_default()
	}

	/// Raises the ledger entry of `address`. Lower values are ignored.
	pub async fn record_contribution(&self, address: Address, amount: U256) {
		let mut inner = self.inner.write().await;
		let entry = inner.contributions.entry(address).or_default();
		if amount > *entry {
			*entry = amount;
		}
	}

	pub fn set_display_name(&self, address: Address, name: Option<String>) {
		self.display_names.insert(address, name);
	}

	pub fn display_name(&self, address: Address) -> Option<String> {
		self.display_names
			.get(&address)
			.and_then(|entry| entry.value().clone())
	}

	/// Sets the auction deadline. The first value wins; later calls return
	/// `false` and leave it untouched.
	pub async fn set_deadline(&self, deadline: u64) -> bool {
		let mut inner = self.inner.write().await;
		if inner.deadline.is_some() {
			return false;
		}
		inner.deadline = Some(deadline);
		true
	}

	pub async fn deadline(&self) -> Option<u64> {
		self.inner.read().await.deadline
	}

	pub async fn snapshot(&self) -> AuctionSnapshot {
		let inner = self.inner.read().await;
		let bidder_display_name = inner
			.current
			.as_ref()
			.and_then(|current| self.display_name(current.sender));

		AuctionSnapshot {
			current: inner.current.clone(),
			bidder_display_name,
			deadline: inner.deadline,
			bid_count: inner.history.len(),
		}
	}

	/// Index of the current record, `None` before any bid is known.
	pub async fn highest_index(&self) -> Option<u64> {
		self.inner
			.read()
			.await
			.current
			.as_ref()
			.map(|current| current.index)
	}

	pub async fn bid_at(&self, index: u64) -> Option<BidRecord> {
		self.inner.read().await.history.get(&index).cloned()
	}

	/// Drops everything, including the deadline.
	pub async fn reset(&self) {
		*self.inner.write().await = StoreInner::default();
		self.display_names.clear();
		debug!("Auction state reset");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use auction_types::B256;
	use std::sync::Arc;

	fn bid(index: u64, sender: u8, amount: u64, message: &str) -> BidRecord {
		BidRecord {
			index,
			sender: Address::repeat_byte(sender),
			amount: U256::from(amount),
			message: message.to_string(),
		}
	}

	fn log_id(byte: u8, log_index: u64) -> EventId {
		EventId::Log {
			tx_hash: B256::repeat_byte(byte),
			log_index,
		}
	}

	#[tokio::test]
	async fn test_apply_is_idempotent_per_event_id() {
		let store = AuctionStateStore::new();
		let record = bid(0, 1, 100, "first");

		assert!(store.apply_bid(record.clone(), log_id(1, 0)).await.advanced());
		let before = store.snapshot().await;

		assert_eq!(
			store.apply_bid(record, log_id(1, 0)).await,
			ApplyOutcome::Duplicate
		);
		assert_eq!(store.snapshot().await, before);
		assert!(store.inner.read().await.processed.contains(&log_id(1, 0)));
	}

	#[tokio::test]
	async fn test_older_record_does_not_regress_projection() {
		let store = AuctionStateStore::new();

		store
			.apply_bid(bid(3, 2, 300, "newest"), EventId::BidIndex(3))
			.await;
		let outcome = store
			.apply_bid(bid(1, 1, 100, "older"), EventId::BidIndex(1))
			.await;

		assert_eq!(outcome, ApplyOutcome::Stored);
		let snapshot = store.snapshot().await;
		assert_eq!(snapshot.current_bid(), Some(U256::from(300u64)));
		assert_eq!(snapshot.current_message(), Some("newest"));
		assert_eq!(snapshot.bid_count, 2);
		assert_eq!(store.bid_at(1).await.unwrap().message, "older");
	}

	#[tokio::test]
	async fn test_bidder_change_reported() {
		let store = AuctionStateStore::new();

		let first = store.apply_bid(bid(0, 1, 100, "a"), log_id(1, 0)).await;
		let same = store.apply_bid(bid(1, 1, 200, "b"), log_id(2, 0)).await;
		let other = store.apply_bid(bid(2, 2, 300, "c"), log_id(3, 0)).await;

		assert!(matches!(
			first,
			ApplyOutcome::Advanced {
				bidder_changed: true,
				..
			}
		));
		assert!(matches!(
			same,
			ApplyOutcome::Advanced {
				bidder_changed: false,
				..
			}
		));
		assert!(matches!(
			other,
			ApplyOutcome::Advanced {
				bidder_changed: true,
				..
			}
		));
	}

	#[tokio::test]
	async fn test_ledger_only_rises() {
		let store = AuctionStateStore::new();
		let sender = Address::repeat_byte(1);

		store.apply_bid(bid(0, 1, 500, "a"), EventId::BidIndex(0)).await;
		assert_eq!(store.get_contribution(sender).await, U256::from(500u64));

		store.record_contribution(sender, U256::from(200u64)).await;
		assert_eq!(store.get_contribution(sender).await, U256::from(500u64));

		store.record_contribution(sender, U256::from(900u64)).await;
		assert_eq!(store.get_contribution(sender).await, U256::from(900u64));

		assert_eq!(
			store.get_contribution(Address::repeat_byte(9)).await,
			U256::ZERO
		);
	}

	#[tokio::test]
	async fn test_deadline_first_write_wins() {
		let store = AuctionStateStore::new();

		assert!(store.set_deadline(1_700_000_000).await);
		assert!(!store.set_deadline(1).await);
		assert_eq!(store.deadline().await, Some(1_700_000_000));
	}

	#[tokio::test]
	async fn test_snapshot_includes_current_bidder_name() {
		let store = AuctionStateStore::new();
		let sender = Address::repeat_byte(4);

		store.apply_bid(bid(0, 4, 10, "gm"), EventId::BidIndex(0)).await;
		assert!(store.snapshot().await.bidder_display_name.is_none());

		store.set_display_name(sender, Some("alice".to_string()));
		assert_eq!(
			store.snapshot().await.bidder_display_name.as_deref(),
			Some("alice")
		);
	}

	#[tokio::test]
	async fn test_reset_clears_everything() {
		let store = AuctionStateStore::new();
		store.apply_bid(bid(0, 1, 10, "x"), log_id(1, 0)).await;
		store.set_deadline(42).await;
		store.set_display_name(Address::repeat_byte(1), Some("bob".into()));

		store.reset().await;

		assert_eq!(store.snapshot().await, AuctionSnapshot::default());
		assert!(store.display_name(Address::repeat_byte(1)).is_none());
		// Processed ids are forgotten too
		assert!(store
			.apply_bid(bid(0, 1, 10, "x"), log_id(1, 0))
			.await
			.advanced());
	}

	#[tokio::test]
	async fn test_concurrent_applies_of_same_event_count_once() {
		let store = Arc::new(AuctionStateStore::new());
		let mut handles = Vec::new();

		for _ in 0..8 {
			let store = store.clone();
			handles.push(tokio::spawn(async move {
				store
					.apply_bid(bid(0, 1, 100, "race"), log_id(7, 1))
					.await
					.advanced()
			}));
		}

		let mut advanced = 0;
		for handle in handles {
			if handle.await.unwrap() {
				advanced += 1;
			}
		}
		assert_eq!(advanced, 1);
		assert_eq!(store.snapshot().await.bid_count, 1);
	}
}
