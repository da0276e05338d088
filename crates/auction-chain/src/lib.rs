//! Chain access for the auction client.
//!
//! This crate provides the contract-call boundary between the client and the
//! node/wallet provider: reads of the auction contract, the two write calls,
//! the log subscription that feeds the ingestion pipeline, confirmation
//! waiting and the network binding flow.

use async_trait::async_trait;
use auction_types::{
	classify_wallet_error, leading_clause, normalize_error_text, Address, BidRecord, ChainEvent,
	TransactionHandle, TransactionReceipt, UserFacingError, WalletFailure,
	INSUFFICIENT_FUNDS_MESSAGE, NO_WALLET_MESSAGE, REJECTED_BY_USER_MESSAGE, U256,
};
use thiserror::Error;
use tokio::sync::mpsc;

pub mod contract;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[cfg(any(test, feature = "testing"))]
pub mod mock;

/// Errors that can occur while talking to the chain or the wallet.
#[derive(Debug, Error)]
pub enum ChainError {
	/// No signing provider is configured or reachable.
	#[error("No wallet available")]
	NoWalletAvailable,
	/// The wallet is on the wrong network and could not be switched.
	#[error("Network mismatch: {0}")]
	NetworkMismatch(String),
	/// A contract read or RPC query failed.
	#[error("Read failed: {0}")]
	Read(String),
	/// The user declined the request in their wallet.
	#[error("Transaction rejected by user")]
	RejectedByUser,
	/// The account cannot cover value plus gas.
	#[error("Insufficient funds")]
	InsufficientFunds,
	/// The transaction could not be handed to the network.
	#[error("Failed to send transaction: {0}")]
	Submission(String),
	/// The transaction was sent but did not confirm successfully.
	#[error("Transaction confirmation failed: {0}")]
	Confirmation(String),
	/// The provider could not be constructed or reached.
	#[error("Connection error: {0}")]
	Connection(String),
	/// The event subscription could not be started.
	#[error("Subscription error: {0}")]
	Subscription(String),
}

impl ChainError {
	/// Maps a raw wallet failure onto the matching error kind.
	pub fn from_wallet_failure(raw: impl Into<String>) -> Self {
		match classify_wallet_error(&raw.into()) {
			WalletFailure::RejectedByUser => ChainError::RejectedByUser,
			WalletFailure::InsufficientFunds => ChainError::InsufficientFunds,
			WalletFailure::Other(text) => ChainError::Submission(text),
		}
	}
}

impl UserFacingError for ChainError {
	fn user_message(&self) -> String {
		match self {
			ChainError::NoWalletAvailable => NO_WALLET_MESSAGE.to_string(),
			ChainError::RejectedByUser => REJECTED_BY_USER_MESSAGE.to_string(),
			ChainError::InsufficientFunds => INSUFFICIENT_FUNDS_MESSAGE.to_string(),
			ChainError::NetworkMismatch(detail) => {
				format!("Wrong network: {}", leading_clause(detail))
			}
			ChainError::Confirmation(detail) => {
				format!("Transaction failed: {}", leading_clause(detail))
			}
			ChainError::Read(detail)
			| ChainError::Submission(detail)
			| ChainError::Connection(detail)
			| ChainError::Subscription(detail) => normalize_error_text(detail),
		}
	}
}

/// Trait defining the interface to the auction contract and its network.
///
/// Reads may fail transiently; callers on the ingestion path treat failures as
/// skippable. Write calls require a connected wallet.
#[async_trait]
pub trait ChainInterface: Send + Sync {
	/// Binds the wallet to the configured network, switching or adding it when
	/// the wallet reports a different chain.
	async fn ensure_network(&self) -> Result<(), ChainError>;

	/// Ensures the network and returns the account that will sign writes.
	async fn connect(&self) -> Result<Address, ChainError>;

	/// Reads the bid history entry at `index`. `Ok(None)` means the index does
	/// not exist.
	async fn read_bid_at(&self, index: u64) -> Result<Option<BidRecord>, ChainError>;

	/// Reads the immutable auction deadline (unix seconds).
	async fn read_deadline(&self) -> Result<u64, ChainError>;

	/// Reads the cumulative amount `address` has sent across its bids.
	async fn read_contribution(&self, address: Address) -> Result<U256, ChainError>;

	/// Reads the registered name of `address`, `None` when unregistered.
	async fn read_display_name(&self, address: Address) -> Result<Option<String>, ChainError>;

	/// Sends `amount` wei to the contract with `message` attached.
	async fn submit_bid(&self, message: &str, amount: U256)
		-> Result<TransactionHandle, ChainError>;

	/// Registers `name` for the connected account.
	async fn submit_registration(&self, name: &str) -> Result<TransactionHandle, ChainError>;

	/// Starts delivering `NewBid` and `DataUpdated` notifications to `sender`.
	async fn subscribe(&self, sender: mpsc::UnboundedSender<ChainEvent>)
		-> Result<(), ChainError>;

	/// Stops the notification stream started by [`ChainInterface::subscribe`].
	async fn unsubscribe(&self) -> Result<(), ChainError>;

	/// Waits until the transaction is mined. There is no client-side timeout.
	async fn await_confirmation(
		&self,
		handle: &TransactionHandle,
	) -> Result<TransactionReceipt, ChainError>;
}
