//! Helpers for turning raw wallet and RPC failures into user-facing text.
//!
//! Wallets and nodes report failures as free-form strings, often with a JSON
//! payload or a parenthesised data blob appended. Known failure patterns are
//! collapsed to fixed phrases, and anything unrecognised is cut down to its
//! leading clause before being shown to a user.

/// Fixed text shown when the user declines a transaction in their wallet.
pub const REJECTED_BY_USER_MESSAGE: &str = "Transaction was rejected in your wallet.";
/// Fixed text shown when the account cannot cover the value plus gas.
pub const INSUFFICIENT_FUNDS_MESSAGE: &str = "Insufficient funds to cover this bid and gas.";
/// Fixed text shown when a write is attempted without a signing provider.
pub const NO_WALLET_MESSAGE: &str = "No wallet available. Configure a wallet to place bids.";

const UNKNOWN_ERROR_MESSAGE: &str = "Something went wrong.";

/// Coarse classification of a failed wallet interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletFailure {
	RejectedByUser,
	InsufficientFunds,
	/// Unrecognised failure, carrying the raw text.
	Other(String),
}

/// Classifies a raw wallet/RPC error string.
pub fn classify_wallet_error(raw: &str) -> WalletFailure {
	let lower = raw.to_lowercase();

	if lower.contains("user rejected")
		|| lower.contains("user denied")
		|| lower.contains("rejected the request")
		|| lower.contains("code: 4001")
		|| lower.contains("\"code\":4001")
	{
		return WalletFailure::RejectedByUser;
	}

	if lower.contains("insufficient funds") {
		return WalletFailure::InsufficientFunds;
	}

	WalletFailure::Other(raw.to_string())
}

/// Returns the part of an error message before any structured detail.
///
/// Cuts at the first `(`, `{` or `[`, then trims whitespace and trailing
/// separators.
pub fn leading_clause(raw: &str) -> String {
	let cut = raw.find(['(', '{', '[']).unwrap_or(raw.len());
	let clause = raw[..cut].trim().trim_end_matches([':', ',', ';', '-']).trim();

	if clause.is_empty() {
		UNKNOWN_ERROR_MESSAGE.to_string()
	} else {
		clause.to_string()
	}
}

/// Normalizes an arbitrary error string for display.
pub fn normalize_error_text(raw: &str) -> String {
	match classify_wallet_error(raw) {
		WalletFailure::RejectedByUser => REJECTED_BY_USER_MESSAGE.to_string(),
		WalletFailure::InsufficientFunds => INSUFFICIENT_FUNDS_MESSAGE.to_string(),
		WalletFailure::Other(text) => leading_clause(&text),
	}
}

/// Errors that can be shown to the person driving the client.
pub trait UserFacingError {
	/// Normalized text suitable for a status banner.
	fn user_message(&self) -> String;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_classify_rejection_variants() {
		assert_eq!(
			classify_wallet_error("MetaMask Tx Signature: User denied transaction signature."),
			WalletFailure::RejectedByUser
		);
		assert_eq!(
			classify_wallet_error("server returned an error response: error code 4001: user rejected transaction"),
			WalletFailure::RejectedByUser
		);
		assert_eq!(
			classify_wallet_error("insufficient funds for gas * price + value"),
			WalletFailure::InsufficientFunds
		);
	}

	#[test]
	fn test_leading_clause_truncation() {
		assert_eq!(
			leading_clause("execution reverted (action=\"estimateGas\", data=0x)"),
			"execution reverted"
		);
		assert_eq!(
			leading_clause("server returned an error response: {\"code\":-32000}"),
			"server returned an error response"
		);
		assert_eq!(leading_clause("nonce too low"), "nonce too low");
		assert_eq!(leading_clause("(no detail)"), UNKNOWN_ERROR_MESSAGE);
	}

	#[test]
	fn test_normalize_known_patterns() {
		assert_eq!(
			normalize_error_text("Error: User rejected the request. {\"code\":4001}"),
			REJECTED_BY_USER_MESSAGE
		);
		assert_eq!(
			normalize_error_text("err: insufficient funds for transfer (address 0x12)"),
			INSUFFICIENT_FUNDS_MESSAGE
		);
	}
}
