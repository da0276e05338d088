//! Transaction delivery types for the auction client.
//!
//! This module defines the handle returned when a transaction is handed to the
//! wallet and the receipt obtained once it has been mined.

use alloy::primitives::B256;
use std::fmt;

/// Handle to a transaction that has been submitted to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle {
	/// The hash of the submitted transaction.
	pub hash: B256,
}

impl TransactionHandle {
	pub fn new(hash: B256) -> Self {
		Self { hash }
	}

	/// Short form of the hash for log lines.
	pub fn short(&self) -> String {
		let hash_str = alloy::hex::encode(self.hash);
		format!("0x{}..", &hash_str[..8])
	}
}

impl fmt::Display for TransactionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.hash)
	}
}

/// Transaction receipt containing execution details.
///
/// Provides information about a transaction after it has been included in a block,
/// including its success status and block number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: B256,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_short_hash() {
		let handle = TransactionHandle::new(B256::repeat_byte(0xab));
		assert_eq!(handle.short(), "0xabababab..");
	}
}
