//! Conversions between wei amounts and human-readable ether strings.

use alloy::primitives::{
	utils::{format_ether, parse_ether},
	U256,
};
use thiserror::Error;

/// Error returned when a user-supplied ether amount cannot be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid amount '{input}': {reason}")]
pub struct AmountParseError {
	pub input: String,
	pub reason: String,
}

/// Formats a wei amount as ether without trailing zeros (`0.0004`, `1`).
pub fn format_amount(amount: U256) -> String {
	let formatted = format_ether(amount);
	if formatted.contains('.') {
		formatted
			.trim_end_matches('0')
			.trim_end_matches('.')
			.to_string()
	} else {
		formatted
	}
}

/// Parses a decimal ether string (`"0.001"`) into wei.
pub fn parse_amount(input: &str) -> Result<U256, AmountParseError> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(AmountParseError {
			input: input.to_string(),
			reason: "amount is empty".to_string(),
		});
	}
	if trimmed.starts_with('-') {
		return Err(AmountParseError {
			input: input.to_string(),
			reason: "amount must not be negative".to_string(),
		});
	}

	parse_ether(trimmed).map_err(|e| AmountParseError {
		input: input.to_string(),
		reason: e.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_format_trims_trailing_zeros() {
		assert_eq!(format_amount(U256::from(400_000_000_000_000u64)), "0.0004");
		assert_eq!(format_amount(U256::from(1_000_000_000_000_000_000u128)), "1");
		assert_eq!(format_amount(U256::ZERO), "0");
	}

	#[test]
	fn test_parse_amount() {
		assert_eq!(
			parse_amount("0.001").unwrap(),
			U256::from(1_000_000_000_000_000u64)
		);
		assert!(parse_amount("").is_err());
		assert!(parse_amount("-1").is_err());
		assert!(parse_amount("abc").is_err());
	}
}
