//! Per-connection session context.

use auction_types::Address;

/// What the engine knows about the person driving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
	/// Account resolved from the wallet on connect.
	pub caller: Option<Address>,
	/// Whether the chain subscription and clock are running.
	pub syncing: bool,
}

impl Session {
	pub fn is_connected(&self) -> bool {
		self.caller.is_some()
	}

	pub fn connect(&mut self, caller: Address) {
		self.caller = Some(caller);
	}

	pub fn reset(&mut self) {
		*self = Session::default();
	}
}
