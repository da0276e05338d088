//! Solidity bindings for the auction contract.
//!
//! The contract keeps an append-only bid history indexed from zero, a
//! per-address cumulative contribution ledger and an optional registered name
//! per address. There is no getter for the history length; reading past the
//! end reverts.

use alloy::sol;

sol! {
	#[sol(rpc)]
	interface IBidBoard {
		/// Auction end time in unix seconds.
		function endTime() external view returns (uint256);

		function bidHistory(uint256 index)
			external
			view
			returns (address sender, uint256 amount, string memory content);

		function addressToName(address account) external view returns (string memory);

		/// Total wei `account` has sent across all of its bids.
		function fullBids(address account) external view returns (uint256);

		function register(string calldata name) external;

		/// Adds `msg.value` to the caller's contribution and records a bid.
		function contribute(string calldata message) external payable;

		event NewBid(address bidder, uint256 amount, string content, uint256 bidIndex);

		event DataUpdated(uint256 id);
	}
}
