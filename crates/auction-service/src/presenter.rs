//! Presentation adapter that reports the auction through the log.

use auction_core::{PresentationInterface, RenderView, Severity};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Logs each view. Views that differ from the previous one only in the
/// remaining time are logged at debug level so the countdown does not flood
/// the output.
#[derive(Default)]
pub struct LogPresenter {
	last: Mutex<Option<RenderView>>,
}

impl LogPresenter {
	pub fn new() -> Self {
		Self::default()
	}
}

fn same_except_remaining(a: &RenderView, b: &RenderView) -> bool {
	RenderView {
		remaining: String::new(),
		..a.clone()
	} == RenderView {
		remaining: String::new(),
		..b.clone()
	}
}

impl PresentationInterface for LogPresenter {
	fn render(&self, view: &RenderView) {
		let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

		let changed = last
			.as_ref()
			.map_or(true, |previous| !same_except_remaining(previous, view));

		if changed {
			info!(
				current_bid = %view.current_bid,
				bidder = view.current_bidder.as_deref().unwrap_or("-"),
				name = view.bidder_display_name.as_deref().unwrap_or("-"),
				message = view.current_message.as_deref().unwrap_or(""),
				next_min = %view.next_min_bid,
				price = view.price_display.as_deref().unwrap_or("-"),
				remaining = %view.remaining,
				account = view.connected_account.as_deref().unwrap_or("-"),
				"Auction"
			);
		} else {
			debug!(remaining = %view.remaining, "Countdown");
		}

		*last = Some(view.clone());
	}

	fn notify(&self, message: &str, severity: Severity) {
		match severity {
			Severity::Error => warn!(%severity, "{}", message),
			Severity::Info | Severity::Success => info!(%severity, "{}", message),
		}
	}

	fn clear_notice(&self) {
		debug!("Notice cleared");
	}
}
