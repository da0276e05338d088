//! Status banner that clears itself after a fixed time.

use crate::presenter::{PresentationInterface, Severity};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shows notices through the presenter and clears each one after
/// `duration`, unless a newer notice replaced it first.
#[derive(Clone)]
pub struct StatusBanner {
	presenter: Arc<dyn PresentationInterface>,
	generation: Arc<AtomicU64>,
	duration: Duration,
}

impl StatusBanner {
	pub fn new(presenter: Arc<dyn PresentationInterface>, duration: Duration) -> Self {
		Self {
			presenter,
			generation: Arc::new(AtomicU64::new(0)),
			duration,
		}
	}

	pub fn show(&self, message: &str, severity: Severity) {
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		self.presenter.notify(message, severity);

		let presenter = self.presenter.clone();
		let current = self.generation.clone();
		let duration = self.duration;
		tokio::spawn(async move {
			tokio::time::sleep(duration).await;
			if current.load(Ordering::SeqCst) == generation {
				presenter.clear_notice();
			}
		});
	}

	pub fn info(&self, message: &str) {
		self.show(message, Severity::Info);
	}

	pub fn success(&self, message: &str) {
		self.show(message, Severity::Success);
	}

	pub fn error(&self, message: &str) {
		self.show(message, Severity::Error);
	}
}
