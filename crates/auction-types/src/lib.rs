//! Shared types for the auction client.
//!
//! Every crate in the workspace speaks in terms of these types: bid records
//! read from the auction contract, the typed notifications produced by the
//! chain subscription, transaction handles and receipts, and the helpers that
//! turn raw wallet/RPC failures into text a user can act on.

pub mod bid;
pub mod delivery;
pub mod errors;
pub mod events;
pub mod units;

pub use alloy::primitives::{Address, B256, U256};
pub use bid::*;
pub use delivery::*;
pub use errors::*;
pub use events::*;
pub use units::*;
