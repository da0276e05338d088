//! Submission coordinator.

use crate::{amount_to_send, check_minimum, SubmissionError};
use auction_chain::{ChainError, ChainInterface};
use auction_config::{AuctionConfig, ConfigError};
use auction_state::AuctionStateStore;
use auction_types::{format_amount, Address, TransactionHandle, TransactionReceipt, U256};
use std::sync::Arc;
use tracing::{info, warn};

/// Input limits and the minimum increment for bids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidRules {
	pub min_increment: U256,
	pub max_message_length: usize,
	pub max_name_length: usize,
}

impl Default for BidRules {
	fn default() -> Self {
		Self {
			// 0.0004 ether
			min_increment: U256::from(400_000_000_000_000u64),
			max_message_length: 256,
			max_name_length: 32,
		}
	}
}

impl TryFrom<&AuctionConfig> for BidRules {
	type Error = ConfigError;

	fn try_from(config: &AuctionConfig) -> Result<Self, Self::Error> {
		Ok(Self {
			min_increment: config.min_increment_wei()?,
			max_message_length: config.max_message_length,
			max_name_length: config.max_name_length,
		})
	}
}

/// A confirmed bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidSubmission {
	pub receipt: TransactionReceipt,
	/// Cumulative total the bid was placed for.
	pub total: U256,
	/// Value actually sent with the transaction.
	pub amount_sent: U256,
}

/// Validates and submits bids and registrations.
pub struct SubmissionCoordinator {
	chain: Arc<dyn ChainInterface>,
	store: Arc<AuctionStateStore>,
	rules: BidRules,
}

impl SubmissionCoordinator {
	pub fn new(
		chain: Arc<dyn ChainInterface>,
		store: Arc<AuctionStateStore>,
		rules: BidRules,
	) -> Self {
		Self {
			chain,
			store,
			rules,
		}
	}

	pub fn rules(&self) -> &BidRules {
		&self.rules
	}

	/// Places a bid that brings `caller`'s cumulative total to `total`.
	///
	/// Only the difference between `total` and what the caller has already
	/// contributed is sent. The bid projection is left to the event path.
	pub async fn submit_bid(
		&self,
		caller: Address,
		total: U256,
		message: &str,
	) -> Result<BidSubmission, SubmissionError> {
		if message.chars().count() > self.rules.max_message_length {
			return Err(SubmissionError::InvalidInput(format!(
				"Message must be at most {} characters.",
				self.rules.max_message_length
			)));
		}

		if let Some(deadline) = self.store.deadline().await {
			if i128::from(chrono::Utc::now().timestamp()) >= i128::from(deadline) {
				return Err(SubmissionError::AuctionEnded);
			}
		}

		let current = self.store.snapshot().await.current_bid();
		check_minimum(total, current, self.rules.min_increment)?;

		let contribution = self
			.chain
			.read_contribution(caller)
			.await
			.map_err(SubmissionError::ChainReadFailure)?;
		self.store.record_contribution(caller, contribution).await;

		let amount = amount_to_send(total, contribution).ok_or_else(|| {
			SubmissionError::InvalidAmount(format!(
				"You have already bid {} ETH, more than the requested total of {} ETH.",
				format_amount(contribution),
				format_amount(total)
			))
		})?;

		info!(
			%caller,
			total = %format_amount(total),
			sending = %format_amount(amount),
			"Submitting bid"
		);

		let handle = self.chain.submit_bid(message, amount).await?;
		let receipt = self.confirm(&handle).await?;

		Ok(BidSubmission {
			receipt,
			total,
			amount_sent: amount,
		})
	}

	/// Registers a display name for `caller` and refreshes the cached name.
	pub async fn submit_registration(
		&self,
		caller: Address,
		name: &str,
	) -> Result<TransactionReceipt, SubmissionError> {
		let name = name.trim();
		let length = name.chars().count();
		if length == 0 || length > self.rules.max_name_length {
			return Err(SubmissionError::InvalidInput(format!(
				"Name must be between 1 and {} characters.",
				self.rules.max_name_length
			)));
		}

		info!(%caller, name, "Submitting registration");
		let handle = self.chain.submit_registration(name).await?;
		let receipt = self.confirm(&handle).await?;

		match self.chain.read_display_name(caller).await {
			Ok(resolved) => self.store.set_display_name(caller, resolved),
			Err(e) => warn!(%caller, "Failed to re-read display name: {}", e),
		}

		Ok(receipt)
	}

	async fn confirm(
		&self,
		handle: &TransactionHandle,
	) -> Result<TransactionReceipt, SubmissionError> {
		let receipt = self
			.chain
			.await_confirmation(handle)
			.await
			.map_err(|e| match e {
				ChainError::Confirmation(detail) => SubmissionError::ConfirmationFailed(detail),
				other => SubmissionError::Chain(other),
			})?;

		if !receipt.success {
			warn!(
				tx_hash = %handle.short(),
				block = receipt.block_number,
				"Transaction reverted"
			);
			return Err(SubmissionError::ConfirmationFailed(format!(
				"transaction {} reverted in block {}",
				handle.short(),
				receipt.block_number
			)));
		}

		info!(
			tx_hash = %handle.short(),
			block = receipt.block_number,
			"Transaction confirmed"
		);
		Ok(receipt)
	}
}
