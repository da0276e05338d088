//! De-duplicating queue of bid indices awaiting a re-read.

use crate::types::StateError;
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Thread-safe queue of bid indices, drained lowest index first.
///
/// Pushing an index that is already queued is a no-op.
pub struct PendingIndexQueue {
	queue: Mutex<PriorityQueue<u64, Reverse<u64>>>,
	max_size: usize,
}

impl PendingIndexQueue {
	pub fn new(max_size: usize) -> Self {
		Self {
			queue: Mutex::new(PriorityQueue::new()),
			max_size,
		}
	}

	fn lock(&self) -> MutexGuard<'_, PriorityQueue<u64, Reverse<u64>>> {
		self.queue.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Queues `index`. Returns `false` if it was already pending.
	pub fn push(&self, index: u64) -> Result<bool, StateError> {
		let mut queue = self.lock();

		if queue.get(&index).is_some() {
			return Ok(false);
		}
		if queue.len() >= self.max_size {
			return Err(StateError::QueueFull(queue.len()));
		}

		queue.push(index, Reverse(index));
		debug!(index, pending = queue.len(), "Queued bid index for refresh");
		Ok(true)
	}

	/// Removes and returns up to `max` indices in ascending order.
	pub fn pop_batch(&self, max: usize) -> Vec<u64> {
		let mut queue = self.lock();
		let mut batch = Vec::with_capacity(max.min(queue.len()));
		while batch.len() < max {
			match queue.pop() {
				Some((index, _)) => batch.push(index),
				None => break,
			}
		}
		batch
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	pub fn clear(&self) {
		self.lock().clear();
		debug!("Cleared pending index queue");
	}
}
