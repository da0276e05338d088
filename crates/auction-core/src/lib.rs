//! Core engine of the auction client.
//!
//! [`AuctionEngine`] owns one session: it loads the deadline and bid history,
//! keeps the store current from contract events and periodic refreshes,
//! drives the countdown, and turns user intents into submissions. Everything
//! the user sees goes through a [`PresentationInterface`].

use auction_chain::ChainError;
use auction_config::ConfigError;
use auction_delivery::SubmissionError;
use auction_types::{leading_clause, UserFacingError};
use thiserror::Error;

pub mod banner;
pub mod clock;
pub mod engine;
pub mod presenter;
pub mod price;
pub mod session;

pub use banner::StatusBanner;
pub use clock::{Countdown, CountdownClock};
pub use engine::{AuctionEngine, UserIntent};
pub use presenter::{PresentationInterface, RenderView, Severity, NO_BIDS_TEXT};
pub use price::{PriceError, PriceFeed};
pub use session::Session;

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Initialization failed: {0}")]
	Initialization(String),
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error(transparent)]
	Chain(#[from] ChainError),
	#[error(transparent)]
	Submission(#[from] SubmissionError),
}

impl UserFacingError for EngineError {
	fn user_message(&self) -> String {
		match self {
			EngineError::Initialization(detail) => {
				format!("Could not load the auction: {}", leading_clause(detail))
			}
			EngineError::Config(e) => leading_clause(&e.to_string()),
			EngineError::InvalidInput(detail) => detail.clone(),
			EngineError::Chain(e) => e.user_message(),
			EngineError::Submission(e) => e.user_message(),
		}
	}
}
