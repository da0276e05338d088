//! Bid types for the auction client.
//!
//! This module defines the immutable bid record read from the contract's bid
//! history and the read-only snapshot of the locally known auction state that
//! is handed to the presentation layer.

use alloy::primitives::{Address, U256};

/// A single entry of the contract's append-only bid history.
///
/// `amount` is the sender's cumulative total at the time of the bid, not the
/// value sent with that particular transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidRecord {
	/// Position of the record in the bid history.
	pub index: u64,
	/// Address that placed the bid.
	pub sender: Address,
	/// Cumulative bid total of `sender`, in wei.
	pub amount: U256,
	/// Message attached to the bid.
	pub message: String,
}

/// Point-in-time copy of the locally known auction state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuctionSnapshot {
	/// The record with the highest known index, if any bid exists.
	pub current: Option<BidRecord>,
	/// Registered name of the current bidder, when one is known.
	pub bidder_display_name: Option<String>,
	/// Auction deadline as a unix timestamp in seconds.
	pub deadline: Option<u64>,
	/// Number of distinct bid records held in history.
	pub bid_count: usize,
}

impl AuctionSnapshot {
	pub fn current_bid(&self) -> Option<U256> {
		self.current.as_ref().map(|bid| bid.amount)
	}

	pub fn current_bidder(&self) -> Option<Address> {
		self.current.as_ref().map(|bid| bid.sender)
	}

	pub fn current_message(&self) -> Option<&str> {
		self.current.as_ref().map(|bid| bid.message.as_str())
	}

	pub fn has_bids(&self) -> bool {
		self.current.is_some()
	}
}
