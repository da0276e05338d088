//! Ingestion pipeline folding chain data into the auction state.

use crate::DiscoveryError;
use auction_chain::ChainInterface;
use auction_config::IngestionConfig;
use auction_state::{ApplyOutcome, AuctionStateStore, PendingIndexQueue};
use auction_types::{Address, BidRecord, ChainEvent, EventId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on indices waiting for a re-read.
const MAX_PENDING_INDICES: usize = 10_000;

/// Consecutive failed reads after which a history scan gives up.
const MAX_CONSECUTIVE_READ_FAILURES: usize = 3;

/// Drain batching parameters.
#[derive(Debug, Clone, Copy)]
pub struct IngestionSettings {
	pub batch_size: usize,
	pub batch_delay: Duration,
}

impl Default for IngestionSettings {
	fn default() -> Self {
		Self {
			batch_size: 10,
			batch_delay: Duration::from_millis(100),
		}
	}
}

impl From<&IngestionConfig> for IngestionSettings {
	fn from(config: &IngestionConfig) -> Self {
		Self {
			batch_size: config.batch_size.max(1),
			batch_delay: Duration::from_millis(config.batch_delay_ms),
		}
	}
}

/// Outcome of a history scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanReport {
	/// Number of `read_bid_at` calls made.
	pub reads: usize,
	/// Index of the record folded into the store, if any.
	pub applied_index: Option<u64>,
}

/// Consumes bid events and history reads and applies them to the store.
pub struct BidIngestionPipeline {
	chain: Arc<dyn ChainInterface>,
	store: Arc<AuctionStateStore>,
	queue: PendingIndexQueue,
	draining: AtomicBool,
	settings: IngestionSettings,
}

impl BidIngestionPipeline {
	pub fn new(
		chain: Arc<dyn ChainInterface>,
		store: Arc<AuctionStateStore>,
		settings: IngestionSettings,
	) -> Self {
		Self {
			chain,
			store,
			queue: PendingIndexQueue::new(MAX_PENDING_INDICES),
			draining: AtomicBool::new(false),
			settings,
		}
	}

	pub fn store(&self) -> &Arc<AuctionStateStore> {
		&self.store
	}

	/// Number of indices waiting to be re-read.
	pub fn pending(&self) -> usize {
		self.queue.len()
	}

	/// Scans the bid history from index zero and applies the latest record.
	pub async fn catch_up(&self) -> ScanReport {
		let report = self.scan_from(0).await;
		info!(
			reads = report.reads,
			latest = ?report.applied_index,
			"Catch-up scan complete"
		);
		report
	}

	/// Resumes the scan after the highest known index.
	pub async fn refresh(&self) -> ScanReport {
		let start = match self.store.highest_index().await {
			Some(index) => index + 1,
			None => 0,
		};
		let report = self.scan_from(start).await;
		if report.applied_index.is_some() {
			debug!(start, latest = ?report.applied_index, "Refresh found newer bids");
		}
		report
	}

	/// Reads `start`, `start + 1`, ... until an index is reported missing,
	/// then applies the highest record read.
	///
	/// A failed read skips that index. The scan only gives up on errors after
	/// `MAX_CONSECUTIVE_READ_FAILURES` of them in a row.
	async fn scan_from(&self, start: u64) -> ScanReport {
		let mut report = ScanReport::default();
		let mut latest: Option<BidRecord> = None;
		let mut index = start;
		let mut failures = 0;

		loop {
			report.reads += 1;
			match self.chain.read_bid_at(index).await {
				Ok(Some(record)) => {
					latest = Some(record);
					failures = 0;
				}
				Ok(None) => break,
				Err(e) => {
					failures += 1;
					if failures >= MAX_CONSECUTIVE_READ_FAILURES {
						warn!(index, failures, "Bid history unreadable, stopping scan: {}", e);
						break;
					}
					warn!(index, "Skipping unreadable bid: {}", e);
				}
			}
			index += 1;
		}

		if let Some(record) = latest {
			let index = record.index;
			self.apply(record, EventId::BidIndex(index)).await;
			report.applied_index = Some(index);
		}

		report
	}

	/// Handles a notification from the chain subscription.
	pub async fn handle_event(&self, event: ChainEvent) -> Result<(), DiscoveryError> {
		match event {
			ChainEvent::NewBid { id, record } => {
				self.apply(record, id).await;
			}
			ChainEvent::DataUpdated { id, data_id } => {
				debug!(%id, data_id, "Queueing bid index for refresh");
				self.queue.push(data_id)?;
				self.drain().await;
			}
		}
		Ok(())
	}

	/// Works through the pending queue in batches.
	///
	/// Only one drain runs at a time. A call made while another drain is
	/// active returns at once; the active drain picks up anything queued in
	/// the meantime when it re-checks the queue.
	pub async fn drain(&self) {
		if self
			.draining
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			debug!("Drain already running");
			return;
		}

		loop {
			let batch = self.queue.pop_batch(self.settings.batch_size);

			if batch.is_empty() {
				self.draining.store(false, Ordering::Release);
				// Items pushed between the empty check and the flag reset
				// would otherwise wait for the next event.
				if self.queue.is_empty()
					|| self
						.draining
						.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
						.is_err()
				{
					return;
				}
				continue;
			}

			debug!(size = batch.len(), "Draining refresh batch");
			for index in batch {
				match self.chain.read_bid_at(index).await {
					Ok(Some(record)) => {
						self.apply(record, EventId::BidIndex(index)).await;
					}
					Ok(None) => warn!(index, "Queued bid index does not exist"),
					Err(e) => warn!(index, "Failed to refresh bid: {}", e),
				}
			}

			if !self.queue.is_empty() {
				tokio::time::sleep(self.settings.batch_delay).await;
			}
		}
	}

	/// Applies a record and resolves the bidder's name when the current
	/// bidder changed.
	async fn apply(&self, record: BidRecord, id: EventId) -> ApplyOutcome {
		let outcome = self.store.apply_bid(record, id).await;

		if let ApplyOutcome::Advanced {
			bidder_changed: true,
			bidder,
		} = outcome
		{
			self.resolve_display_name(bidder).await;
		}

		outcome
	}

	/// Reads and caches the registered name of `address`.
	pub async fn resolve_display_name(&self, address: Address) {
		match self.chain.read_display_name(address).await {
			Ok(name) => self.store.set_display_name(address, name),
			Err(e) => warn!(%address, "Failed to resolve display name: {}", e),
		}
	}

	/// Drops queued work. Used when the session is torn down.
	pub fn clear_pending(&self) {
		self.queue.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use auction_chain::mock::MockChain;
	use auction_types::{B256, U256};

	fn pipeline(chain: Arc<MockChain>) -> BidIngestionPipeline {
		BidIngestionPipeline::new(
			chain,
			Arc::new(AuctionStateStore::new()),
			IngestionSettings {
				batch_size: 10,
				batch_delay: Duration::from_millis(1),
			},
		)
	}

	fn seed(chain: &MockChain, count: u64) {
		for i in 0..count {
			chain.push_bid(
				Address::repeat_byte((i % 3) as u8 + 1),
				U256::from((i + 1) * 1_000),
				&format!("bid {}", i),
			);
		}
	}

	#[tokio::test]
	async fn test_catch_up_reads_once_past_the_end() {
		let chain = Arc::new(MockChain::new());
		seed(&chain, 5);
		let pipeline = pipeline(chain.clone());

		let report = pipeline.catch_up().await;

		assert_eq!(report.reads, 6);
		assert_eq!(chain.read_calls(), 6);
		assert_eq!(report.applied_index, Some(4));

		let snapshot = pipeline.store().snapshot().await;
		assert_eq!(snapshot.current_bid(), Some(U256::from(5_000u64)));
		assert_eq!(snapshot.current_message(), Some("bid 4"));
		assert_eq!(snapshot.bid_count, 1);
	}

	#[tokio::test]
	async fn test_catch_up_on_empty_auction() {
		let chain = Arc::new(MockChain::new());
		let pipeline = pipeline(chain.clone());

		let report = pipeline.catch_up().await;

		assert_eq!(report.reads, 1);
		assert_eq!(report.applied_index, None);
		assert!(!pipeline.store().snapshot().await.has_bids());
	}

	#[tokio::test]
	async fn test_catch_up_skips_unreadable_index() {
		let chain = Arc::new(MockChain::new());
		seed(&chain, 5);
		chain.fail_index(1);
		let pipeline = pipeline(chain.clone());

		let report = pipeline.catch_up().await;

		assert_eq!(report.reads, 6);
		assert_eq!(report.applied_index, Some(4));
		assert_eq!(
			pipeline.store().snapshot().await.current_bid(),
			Some(U256::from(5_000u64))
		);
	}

	#[tokio::test]
	async fn test_catch_up_gives_up_after_repeated_failures() {
		let chain = Arc::new(MockChain::new());
		seed(&chain, 6);
		for index in 2..5 {
			chain.fail_index(index);
		}
		let pipeline = pipeline(chain.clone());

		let report = pipeline.catch_up().await;

		assert_eq!(report.reads, 5);
		assert_eq!(report.applied_index, Some(1));
	}

	#[tokio::test]
	async fn test_catch_up_skips_failure_at_the_tail() {
		let chain = Arc::new(MockChain::new());
		seed(&chain, 4);
		chain.fail_index(3);
		let pipeline = pipeline(chain.clone());

		let report = pipeline.catch_up().await;

		// index 3 fails, index 4 does not exist
		assert_eq!(report.reads, 5);
		assert_eq!(report.applied_index, Some(2));

		// The missed record is picked up by the next refresh
		let chain_ok = Arc::new(MockChain::new());
		seed(&chain_ok, 4);
		let recovering = BidIngestionPipeline::new(
			chain_ok,
			pipeline.store().clone(),
			IngestionSettings::default(),
		);
		let refreshed = recovering.refresh().await;
		assert_eq!(refreshed.applied_index, Some(3));
	}

	#[tokio::test]
	async fn test_refresh_resumes_after_highest_index() {
		let chain = Arc::new(MockChain::new());
		seed(&chain, 3);
		let pipeline = pipeline(chain.clone());
		pipeline.catch_up().await;

		seed(&chain, 2);
		let before = chain.read_calls();
		let report = pipeline.refresh().await;

		// indices 3 and 4 plus the read past the end
		assert_eq!(chain.read_calls() - before, 3);
		assert_eq!(report.applied_index, Some(4));
		assert_eq!(pipeline.store().highest_index().await, Some(4));
	}

	#[tokio::test]
	async fn test_new_bid_event_applied_once() {
		let chain = Arc::new(MockChain::new());
		let pipeline = pipeline(chain.clone());
		let record = BidRecord {
			index: 0,
			sender: Address::repeat_byte(7),
			amount: U256::from(1_000u64),
			message: "gm".to_string(),
		};
		let event = ChainEvent::NewBid {
			id: EventId::Log {
				tx_hash: B256::repeat_byte(0xab),
				log_index: 2,
			},
			record,
		};

		pipeline.handle_event(event.clone()).await.unwrap();
		let after_first = pipeline.store().snapshot().await;
		pipeline.handle_event(event).await.unwrap();

		assert_eq!(pipeline.store().snapshot().await, after_first);
		assert_eq!(after_first.bid_count, 1);
		// The event carries the full record
		assert_eq!(chain.read_calls(), 0);
	}

	#[tokio::test]
	async fn test_duplicate_transaction_via_push_and_catch_up() {
		let chain = Arc::new(MockChain::new());
		let record = chain.push_bid(Address::repeat_byte(1), U256::from(1_000u64), "only");
		let pipeline = pipeline(chain.clone());

		pipeline
			.handle_event(ChainEvent::NewBid {
				id: EventId::Log {
					tx_hash: B256::repeat_byte(1),
					log_index: 0,
				},
				record: record.clone(),
			})
			.await
			.unwrap();
		pipeline.catch_up().await;

		let snapshot = pipeline.store().snapshot().await;
		assert_eq!(snapshot.current, Some(record));
		assert_eq!(snapshot.bid_count, 1);
	}

	#[tokio::test]
	async fn test_data_updated_drains_in_batches() {
		let chain = Arc::new(MockChain::new());
		seed(&chain, 25);
		let pipeline = pipeline(chain.clone());

		for index in 0..24 {
			pipeline.queue.push(index).unwrap();
		}
		pipeline
			.handle_event(ChainEvent::DataUpdated {
				id: EventId::Log {
					tx_hash: B256::repeat_byte(9),
					log_index: 0,
				},
				data_id: 24,
			})
			.await
			.unwrap();

		assert_eq!(pipeline.pending(), 0);
		assert_eq!(chain.read_calls(), 25);
		assert_eq!(pipeline.store().highest_index().await, Some(24));
		assert_eq!(pipeline.store().snapshot().await.bid_count, 25);
	}

	#[tokio::test]
	async fn test_concurrent_drains_do_not_double_read() {
		let chain = Arc::new(MockChain::new());
		seed(&chain, 30);
		let pipeline = Arc::new(pipeline(chain.clone()));

		for index in 0..30 {
			pipeline.queue.push(index).unwrap();
		}

		let a = pipeline.clone();
		let b = pipeline.clone();
		tokio::join!(a.drain(), b.drain());

		assert_eq!(chain.read_calls(), 30);
		assert_eq!(pipeline.pending(), 0);
		assert!(!pipeline.draining.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn test_drain_skips_failed_items() {
		let chain = Arc::new(MockChain::new());
		seed(&chain, 3);
		chain.fail_index(1);
		let pipeline = pipeline(chain.clone());

		for index in 0..3 {
			pipeline.queue.push(index).unwrap();
		}
		pipeline.drain().await;

		assert!(pipeline.store().bid_at(1).await.is_none());
		assert!(pipeline.store().bid_at(2).await.is_some());
		assert_eq!(pipeline.store().highest_index().await, Some(2));
	}

	#[tokio::test]
	async fn test_bidder_name_resolved_on_change() {
		let chain = Arc::new(MockChain::new());
		let bidder = Address::repeat_byte(1);
		chain.set_name(bidder, "alice");
		chain.push_bid(bidder, U256::from(1_000u64), "hello");
		let pipeline = pipeline(chain.clone());

		pipeline.catch_up().await;

		assert_eq!(
			pipeline.store().snapshot().await.bidder_display_name.as_deref(),
			Some("alice")
		);
	}

	#[tokio::test]
	async fn test_applied_records_raise_ledger() {
		let chain = Arc::new(MockChain::new());
		let bidder = Address::repeat_byte(2);
		chain.push_bid(bidder, U256::from(3_000u64), "x");
		let pipeline = pipeline(chain.clone());

		pipeline.catch_up().await;

		assert_eq!(
			pipeline.store().get_contribution(bidder).await,
			U256::from(3_000u64)
		);
	}
}
