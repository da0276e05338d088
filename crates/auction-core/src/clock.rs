//! Countdown to the auction deadline.

use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// A single countdown reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
	Remaining {
		hours: u64,
		minutes: u64,
		seconds: u64,
	},
	Ended,
}

impl Countdown {
	pub fn is_ended(&self) -> bool {
		matches!(self, Countdown::Ended)
	}
}

impl fmt::Display for Countdown {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Countdown::Remaining {
				hours,
				minutes,
				seconds,
			} => write!(f, "{}h {:02}m {:02}s", hours, minutes, seconds),
			Countdown::Ended => write!(f, "Auction ended"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
	Running,
	Ended,
}

/// Derives the remaining time from the immutable deadline.
///
/// Once a tick observes the deadline, the clock stays ended whatever later
/// `now` values it is given.
#[derive(Debug, Clone)]
pub struct CountdownClock {
	deadline: u64,
	state: ClockState,
}

impl CountdownClock {
	pub fn new(deadline: u64) -> Self {
		Self {
			deadline,
			state: ClockState::Running,
		}
	}

	pub fn is_ended(&self) -> bool {
		self.state == ClockState::Ended
	}

	/// Computes the reading at unix time `now`.
	pub fn tick(&mut self, now: i64) -> Countdown {
		if self.state == ClockState::Ended {
			return Countdown::Ended;
		}

		// Widened so deadlines past i64::MAX stay in the future.
		let remaining = i128::from(self.deadline) - i128::from(now);
		if remaining <= 0 {
			self.state = ClockState::Ended;
			return Countdown::Ended;
		}

		let remaining = u64::try_from(remaining).unwrap_or(u64::MAX);
		Countdown::Remaining {
			hours: remaining / 3600,
			minutes: (remaining % 3600) / 60,
			seconds: remaining % 60,
		}
	}

	/// Ticks once a second against the wall clock and forwards each reading.
	/// Returns after forwarding `Ended`, or when the receiver is gone.
	pub async fn run(mut self, sender: mpsc::UnboundedSender<Countdown>) {
		let mut interval = tokio::time::interval(Duration::from_secs(1));

		loop {
			interval.tick().await;
			let reading = self.tick(chrono::Utc::now().timestamp());
			if sender.send(reading).is_err() || reading.is_ended() {
				break;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_tick_splits_remaining_time() {
		let mut clock = CountdownClock::new(10_000);

		assert_eq!(
			clock.tick(10_000 - 3_723),
			Countdown::Remaining {
				hours: 1,
				minutes: 2,
				seconds: 3
			}
		);
		assert_eq!(clock.tick(9_999).to_string(), "0h 00m 01s");
	}

	#[test]
	fn test_ended_is_terminal() {
		let mut clock = CountdownClock::new(1_000);

		assert_eq!(clock.tick(1_000), Countdown::Ended);
		assert!(clock.is_ended());
		// A clock going backwards does not revive the auction
		assert_eq!(clock.tick(10), Countdown::Ended);
	}

	#[test]
	fn test_far_future_deadline_is_running() {
		let mut clock = CountdownClock::new(u64::MAX);

		let reading = clock.tick(1_700_000_000);
		assert!(!reading.is_ended());
		assert_eq!(
			reading,
			Countdown::Remaining {
				hours: (u64::MAX - 1_700_000_000) / 3600,
				minutes: ((u64::MAX - 1_700_000_000) % 3600) / 60,
				seconds: (u64::MAX - 1_700_000_000) % 60,
			}
		);
		assert!(!CountdownClock::new(i64::MAX as u64 + 1).tick(0).is_ended());
	}

	#[tokio::test]
	async fn test_run_stops_after_ended() {
		let (tx, mut rx) = mpsc::unbounded_channel();
		CountdownClock::new(1).run(tx).await;

		assert_eq!(rx.recv().await, Some(Countdown::Ended));
		assert_eq!(rx.recv().await, None);
	}
}
