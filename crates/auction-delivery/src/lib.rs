//! Bid and registration submission for the auction client.
//!
//! This module validates user intents against the locally known auction
//! state, works out how much value a bid must carry given what the caller has
//! already contributed, hands the transaction to the chain and waits for it
//! to be mined. It never writes the bid projection itself; confirmed bids
//! come back through the event subscription.

use auction_chain::ChainError;
use auction_types::{format_amount, leading_clause, UserFacingError, U256};
use thiserror::Error;

pub mod coordinator;

pub use coordinator::{BidRules, BidSubmission, SubmissionCoordinator};

/// Errors that can occur while submitting a bid or registration.
#[derive(Debug, Error)]
pub enum SubmissionError {
	/// The request is malformed or below the minimum bid.
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	/// The caller's prior contribution already exceeds the requested total.
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	/// The auction deadline has passed.
	#[error("Auction has ended")]
	AuctionEnded,
	/// The caller's prior contribution could not be read.
	#[error("Failed to read contribution: {0}")]
	ChainReadFailure(#[source] ChainError),
	/// The wallet or network refused the transaction.
	#[error(transparent)]
	Chain(#[from] ChainError),
	/// The transaction was mined but reverted, or its receipt could not be read.
	#[error("Transaction confirmation failed: {0}")]
	ConfirmationFailed(String),
}

impl UserFacingError for SubmissionError {
	fn user_message(&self) -> String {
		match self {
			SubmissionError::InvalidInput(detail) | SubmissionError::InvalidAmount(detail) => {
				detail.clone()
			}
			SubmissionError::AuctionEnded => "The auction has ended.".to_string(),
			SubmissionError::ChainReadFailure(e) => {
				format!("Could not read your previous bids: {}", e.user_message())
			}
			SubmissionError::Chain(e) => e.user_message(),
			SubmissionError::ConfirmationFailed(detail) => {
				format!("Transaction failed: {}", leading_clause(detail))
			}
		}
	}
}

/// Smallest total shown to the user as the next bid floor.
///
/// A new bid must be strictly greater than this value.
pub fn next_min_bid(current: Option<U256>, min_increment: U256) -> U256 {
	current.unwrap_or_default().saturating_add(min_increment)
}

/// Value a bid must carry so that the caller's cumulative total reaches
/// `total`. `None` when the caller has already contributed more than `total`.
pub fn amount_to_send(total: U256, contribution: U256) -> Option<U256> {
	total.checked_sub(contribution)
}

/// Checks that `total` clears the minimum bid.
pub fn check_minimum(
	total: U256,
	current: Option<U256>,
	min_increment: U256,
) -> Result<(), SubmissionError> {
	let floor = next_min_bid(current, min_increment);
	if total > floor {
		Ok(())
	} else {
		Err(SubmissionError::InvalidInput(format!(
			"Bid must be greater than {} ETH.",
			format_amount(floor)
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use auction_types::parse_amount;

	fn eth(value: &str) -> U256 {
		parse_amount(value).unwrap()
	}

	#[test]
	fn test_next_min_bid() {
		assert_eq!(next_min_bid(None, eth("0.0004")), eth("0.0004"));
		assert_eq!(next_min_bid(Some(eth("0.001")), eth("0.0004")), eth("0.0014"));
	}

	#[test]
	fn test_amount_to_send() {
		assert_eq!(amount_to_send(eth("0.002"), eth("0.001")), Some(eth("0.001")));
		assert_eq!(amount_to_send(eth("0.002"), U256::ZERO), Some(eth("0.002")));
		assert_eq!(amount_to_send(eth("0.001"), eth("0.002")), None);
	}

	#[test]
	fn test_minimum_is_exclusive() {
		let inc = eth("0.0004");
		assert!(check_minimum(eth("0.0014"), Some(eth("0.001")), inc).is_err());
		assert!(check_minimum(eth("0.0015"), Some(eth("0.001")), inc).is_ok());
		assert!(check_minimum(eth("0.0004"), None, inc).is_err());
		assert!(check_minimum(eth("0.0005"), None, inc).is_ok());
	}

	#[test]
	fn test_user_messages() {
		let below = check_minimum(eth("0.001"), Some(eth("0.001")), eth("0.0004")).unwrap_err();
		assert_eq!(below.user_message(), "Bid must be greater than 0.0014 ETH.");

		let rejected = SubmissionError::Chain(ChainError::RejectedByUser);
		assert_eq!(
			rejected.user_message(),
			auction_types::REJECTED_BY_USER_MESSAGE
		);

		let reverted = SubmissionError::ConfirmationFailed("reverted (status 0)".into());
		assert_eq!(reverted.user_message(), "Transaction failed: reverted");
	}
}
