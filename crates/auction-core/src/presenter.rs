//! Presentation boundary.
//!
//! The engine never draws anything itself. It builds a [`RenderView`] from
//! the store and clock and hands it to whatever implements
//! [`PresentationInterface`], together with transient status notices.

use crate::clock::Countdown;
use auction_delivery::next_min_bid;
use auction_types::{format_amount, AuctionSnapshot, U256};
use std::fmt;

/// Text shown in place of the current bid when the history is empty.
pub const NO_BIDS_TEXT: &str = "No bids yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
	Info,
	Success,
	Error,
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Severity::Info => write!(f, "info"),
			Severity::Success => write!(f, "success"),
			Severity::Error => write!(f, "error"),
		}
	}
}

/// Display-ready auction state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderView {
	/// Formatted current bid, or [`NO_BIDS_TEXT`].
	pub current_bid: String,
	pub current_bidder: Option<String>,
	pub bidder_display_name: Option<String>,
	pub current_message: Option<String>,
	/// Exclusive floor for the next bid.
	pub next_min_bid: String,
	pub remaining: String,
	/// Fiat value of the current bid, e.g. `≈ $4.12`.
	pub price_display: Option<String>,
	/// Address of the connected account, if any.
	pub connected_account: Option<String>,
}

impl RenderView {
	pub fn build(
		snapshot: &AuctionSnapshot,
		countdown: Option<Countdown>,
		min_increment: U256,
		usd_price: Option<f64>,
		currency_symbol: &str,
	) -> Self {
		let current_bid = match snapshot.current_bid() {
			Some(amount) => format!("{} {}", format_amount(amount), currency_symbol),
			None => NO_BIDS_TEXT.to_string(),
		};

		let next_min = next_min_bid(snapshot.current_bid(), min_increment);

		let price_display = match (snapshot.current_bid(), usd_price) {
			(Some(amount), Some(price)) => Some(crate::price::usd_display(amount, price)),
			_ => None,
		};

		Self {
			current_bid,
			current_bidder: snapshot.current_bidder().map(|a| a.to_string()),
			bidder_display_name: snapshot.bidder_display_name.clone(),
			current_message: snapshot.current_message().map(str::to_string),
			next_min_bid: format!("{} {}", format_amount(next_min), currency_symbol),
			remaining: countdown
				.map(|c| c.to_string())
				.unwrap_or_else(|| "--".to_string()),
			price_display,
			connected_account: None,
		}
	}

	pub fn with_account(mut self, account: Option<String>) -> Self {
		self.connected_account = account;
		self
	}
}

/// Receiver of render updates and status notices.
pub trait PresentationInterface: Send + Sync {
	fn render(&self, view: &RenderView);

	fn notify(&self, message: &str, severity: Severity);

	/// Removes the notice shown by the last `notify`.
	fn clear_notice(&self);
}


#[cfg(test)]
mod tests {
	use super::*;
	use auction_types::{parse_amount, Address, BidRecord};

	#[test]
	fn test_empty_auction_view() {
		let view = RenderView::build(
			&AuctionSnapshot::default(),
			None,
			parse_amount("0.0004").unwrap(),
			Some(3000.0),
			"ETH",
		);

		assert_eq!(view.current_bid, NO_BIDS_TEXT);
		assert_eq!(view.next_min_bid, "0.0004 ETH");
		assert_eq!(view.remaining, "--");
		assert!(view.price_display.is_none());
	}

	#[test]
	fn test_view_with_bid() {
		let snapshot = AuctionSnapshot {
			current: Some(BidRecord {
				index: 0,
				sender: Address::repeat_byte(1),
				amount: parse_amount("0.001").unwrap(),
				message: "gm".to_string(),
			}),
			bidder_display_name: Some("alice".to_string()),
			deadline: Some(100),
			bid_count: 1,
		};

		let view = RenderView::build(
			&snapshot,
			Some(Countdown::Ended),
			parse_amount("0.0004").unwrap(),
			Some(2500.0),
			"ETH",
		);

		assert_eq!(view.current_bid, "0.001 ETH");
		assert_eq!(view.next_min_bid, "0.0014 ETH");
		assert_eq!(view.current_message.as_deref(), Some("gm"));
		assert_eq!(view.bidder_display_name.as_deref(), Some("alice"));
		assert_eq!(view.remaining, "Auction ended");
		assert_eq!(view.price_display.as_deref(), Some("≈ $2.50"));
	}
}
