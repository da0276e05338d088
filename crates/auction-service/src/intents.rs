//! Parsing of interactive commands typed in watch mode.

use auction_core::UserIntent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const HELP: &str = "commands: connect | disconnect | bid <amount> [message] | \
	register <name> | refresh | quit";

/// Parses one input line. `Ok(None)` for blank lines.
pub fn parse_intent(line: &str) -> Result<Option<UserIntent>, String> {
	let line = line.trim();
	if line.is_empty() {
		return Ok(None);
	}

	let (command, rest) = match line.split_once(char::is_whitespace) {
		Some((command, rest)) => (command, rest.trim()),
		None => (line, ""),
	};

	let intent = match command.to_lowercase().as_str() {
		"connect" => UserIntent::Connect,
		"disconnect" => UserIntent::Disconnect,
		"refresh" => UserIntent::Refresh,
		"quit" | "exit" => UserIntent::Quit,
		"bid" => {
			let (amount, message) = match rest.split_once(char::is_whitespace) {
				Some((amount, message)) => (amount, message.trim()),
				None => (rest, ""),
			};
			if amount.is_empty() {
				return Err("usage: bid <amount> [message]".to_string());
			}
			UserIntent::Bid {
				amount: amount.to_string(),
				message: message.to_string(),
			}
		}
		"register" => {
			if rest.is_empty() {
				return Err("usage: register <name>".to_string());
			}
			UserIntent::Register {
				name: rest.to_string(),
			}
		}
		other => return Err(format!("unknown command '{}'; {}", other, HELP)),
	};

	Ok(Some(intent))
}

/// Reads stdin line by line and forwards parsed intents until EOF.
pub async fn read_stdin_intents(sender: mpsc::UnboundedSender<UserIntent>) {
	let mut lines = BufReader::new(tokio::io::stdin()).lines();

	loop {
		match lines.next_line().await {
			Ok(Some(line)) => {
				if line.trim().eq_ignore_ascii_case("help") {
					println!("{}", HELP);
					continue;
				}
				match parse_intent(&line) {
					Ok(Some(intent)) => {
						if sender.send(intent).is_err() {
							break;
						}
					}
					Ok(None) => {}
					Err(e) => println!("{}", e),
				}
			}
			Ok(None) => {
				debug!("stdin closed");
				break;
			}
			Err(e) => {
				warn!("Failed to read stdin: {}", e);
				break;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_bid_with_message() {
		assert_eq!(
			parse_intent("bid 0.002   gm everyone ").unwrap(),
			Some(UserIntent::Bid {
				amount: "0.002".into(),
				message: "gm everyone".into()
			})
		);
		assert_eq!(
			parse_intent("BID 1").unwrap(),
			Some(UserIntent::Bid {
				amount: "1".into(),
				message: String::new()
			})
		);
	}

	#[test]
	fn test_parse_simple_commands() {
		assert_eq!(parse_intent("connect").unwrap(), Some(UserIntent::Connect));
		assert_eq!(parse_intent(" quit ").unwrap(), Some(UserIntent::Quit));
		assert_eq!(parse_intent("").unwrap(), None);
		assert_eq!(
			parse_intent("register  Alice Smith").unwrap(),
			Some(UserIntent::Register {
				name: "Alice Smith".into()
			})
		);
	}

	#[test]
	fn test_parse_errors() {
		assert!(parse_intent("bid").is_err());
		assert!(parse_intent("register").is_err());
		assert!(parse_intent("withdraw 1").is_err());
	}
}
