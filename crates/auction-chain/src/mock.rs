//! In-memory chain used by tests across the workspace.

use crate::{ChainError, ChainInterface};
use async_trait::async_trait;
use auction_types::{
	Address, BidRecord, ChainEvent, EventId, TransactionHandle, TransactionReceipt, B256, U256,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// A write recorded by [`MockChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
	Bid { message: String, amount: U256 },
	Registration { name: String },
}

#[derive(Default)]
struct MockState {
	bids: Vec<BidRecord>,
	failing_indices: HashSet<u64>,
	deadline: u64,
	deadline_fails: bool,
	contributions: HashMap<Address, U256>,
	contribution_read_fails: bool,
	names: HashMap<Address, String>,
	account: Option<Address>,
	next_submit_error: Option<String>,
	submissions: Vec<Submission>,
	confirmation_success: bool,
	confirmation_delay: Option<Duration>,
	subscriber: Option<mpsc::UnboundedSender<ChainEvent>>,
	reads_at_subscribe: Option<usize>,
	tx_counter: u64,
}

/// Mock implementation of [`ChainInterface`] backed by plain collections.
///
/// Bids submitted through it behave like the contract: the sender's
/// contribution grows by the sent amount, a cumulative record is appended to
/// the history and a `NewBid` event is pushed to the subscriber.
pub struct MockChain {
	state: Mutex<MockState>,
	read_calls: AtomicUsize,
}

impl Default for MockChain {
	fn default() -> Self {
		Self::new()
	}
}

impl MockChain {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(MockState {
				confirmation_success: true,
				..Default::default()
			}),
			read_calls: AtomicUsize::new(0),
		}
	}

	/// Mock with a connectable account.
	pub fn with_account(account: Address) -> Self {
		let chain = Self::new();
		chain.state.lock().unwrap().account = Some(account);
		chain
	}

	/// Appends a record at the next index and returns it.
	pub fn push_bid(&self, sender: Address, amount: U256, message: &str) -> BidRecord {
		let mut state = self.state.lock().unwrap();
		let record = BidRecord {
			index: state.bids.len() as u64,
			sender,
			amount,
			message: message.to_string(),
		};
		state.bids.push(record.clone());
		let entry = state.contributions.entry(sender).or_default();
		*entry = (*entry).max(amount);
		record
	}

	/// Makes reads of `index` fail with a transient error.
	pub fn fail_index(&self, index: u64) {
		self.state.lock().unwrap().failing_indices.insert(index);
	}

	pub fn set_deadline(&self, deadline: u64) {
		self.state.lock().unwrap().deadline = deadline;
	}

	pub fn fail_deadline(&self) {
		self.state.lock().unwrap().deadline_fails = true;
	}

	pub fn set_contribution(&self, address: Address, amount: U256) {
		self.state.lock().unwrap().contributions.insert(address, amount);
	}

	pub fn fail_contribution_reads(&self) {
		self.state.lock().unwrap().contribution_read_fails = true;
	}

	pub fn set_name(&self, address: Address, name: &str) {
		self.state
			.lock()
			.unwrap()
			.names
			.insert(address, name.to_string());
	}

	/// The next write fails with the given raw wallet text.
	pub fn reject_next_submission(&self, raw: &str) {
		self.state.lock().unwrap().next_submit_error = Some(raw.to_string());
	}

	/// Whether submitted transactions confirm as successful.
	pub fn set_confirmation_success(&self, success: bool) {
		self.state.lock().unwrap().confirmation_success = success;
	}

	/// Makes `await_confirmation` wait this long before answering.
	pub fn set_confirmation_delay(&self, delay: Duration) {
		self.state.lock().unwrap().confirmation_delay = Some(delay);
	}

	/// Number of `read_bid_at` calls made so far.
	pub fn read_calls(&self) -> usize {
		self.read_calls.load(Ordering::SeqCst)
	}

	pub fn submissions(&self) -> Vec<Submission> {
		self.state.lock().unwrap().submissions.clone()
	}

	pub fn is_subscribed(&self) -> bool {
		self.state.lock().unwrap().subscriber.is_some()
	}

	/// `read_bid_at` calls made before the last `subscribe`.
	pub fn reads_at_subscribe(&self) -> Option<usize> {
		self.state.lock().unwrap().reads_at_subscribe
	}

	fn take_submit_error(state: &mut MockState) -> Result<(), ChainError> {
		match state.next_submit_error.take() {
			Some(raw) => Err(ChainError::from_wallet_failure(raw)),
			None => Ok(()),
		}
	}

	fn next_hash(state: &mut MockState) -> B256 {
		state.tx_counter += 1;
		B256::left_padding_from(&state.tx_counter.to_be_bytes())
	}
}

#[async_trait]
impl ChainInterface for MockChain {
	async fn ensure_network(&self) -> Result<(), ChainError> {
		Ok(())
	}

	async fn connect(&self) -> Result<Address, ChainError> {
		self.state
			.lock()
			.unwrap()
			.account
			.ok_or(ChainError::NoWalletAvailable)
	}

	async fn read_bid_at(&self, index: u64) -> Result<Option<BidRecord>, ChainError> {
		self.read_calls.fetch_add(1, Ordering::SeqCst);
		let state = self.state.lock().unwrap();
		if state.failing_indices.contains(&index) {
			return Err(ChainError::Read(format!("bidHistory({}): timeout", index)));
		}
		Ok(state.bids.get(index as usize).cloned())
	}

	async fn read_deadline(&self) -> Result<u64, ChainError> {
		let state = self.state.lock().unwrap();
		if state.deadline_fails {
			return Err(ChainError::Read("endTime: timeout".to_string()));
		}
		Ok(state.deadline)
	}

	async fn read_contribution(&self, address: Address) -> Result<U256, ChainError> {
		let state = self.state.lock().unwrap();
		if state.contribution_read_fails {
			return Err(ChainError::Read(format!("fullBids({}): timeout", address)));
		}
		Ok(state.contributions.get(&address).copied().unwrap_or_default())
	}

	async fn read_display_name(&self, address: Address) -> Result<Option<String>, ChainError> {
		Ok(self
			.state
			.lock()
			.unwrap()
			.names
			.get(&address)
			.filter(|name| !name.is_empty())
			.cloned())
	}

	async fn submit_bid(
		&self,
		message: &str,
		amount: U256,
	) -> Result<TransactionHandle, ChainError> {
		let mut state = self.state.lock().unwrap();
		let sender = state.account.ok_or(ChainError::NoWalletAvailable)?;
		Self::take_submit_error(&mut state)?;

		state.submissions.push(Submission::Bid {
			message: message.to_string(),
			amount,
		});

		let hash = Self::next_hash(&mut state);
		if state.confirmation_success {
			let total = state.contributions.get(&sender).copied().unwrap_or_default() + amount;
			state.contributions.insert(sender, total);
			let record = BidRecord {
				index: state.bids.len() as u64,
				sender,
				amount: total,
				message: message.to_string(),
			};
			state.bids.push(record.clone());
			if let Some(subscriber) = &state.subscriber {
				let _ = subscriber.send(ChainEvent::NewBid {
					id: EventId::Log {
						tx_hash: hash,
						log_index: 0,
					},
					record,
				});
			}
		}

		Ok(TransactionHandle::new(hash))
	}

	async fn submit_registration(&self, name: &str) -> Result<TransactionHandle, ChainError> {
		let mut state = self.state.lock().unwrap();
		let sender = state.account.ok_or(ChainError::NoWalletAvailable)?;
		Self::take_submit_error(&mut state)?;

		state.submissions.push(Submission::Registration {
			name: name.to_string(),
		});
		if state.confirmation_success {
			state.names.insert(sender, name.to_string());
		}

		Ok(TransactionHandle::new(Self::next_hash(&mut state)))
	}

	async fn subscribe(&self, sender: mpsc::UnboundedSender<ChainEvent>) -> Result<(), ChainError> {
		let mut state = self.state.lock().unwrap();
		state.subscriber = Some(sender);
		state.reads_at_subscribe = Some(self.read_calls());
		Ok(())
	}

	async fn unsubscribe(&self) -> Result<(), ChainError> {
		self.state.lock().unwrap().subscriber = None;
		Ok(())
	}

	async fn await_confirmation(
		&self,
		handle: &TransactionHandle,
	) -> Result<TransactionReceipt, ChainError> {
		let delay = self.state.lock().unwrap().confirmation_delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let state = self.state.lock().unwrap();
		Ok(TransactionReceipt {
			hash: handle.hash,
			block_number: state.tx_counter,
			success: state.confirmation_success,
		})
	}
}
