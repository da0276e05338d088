//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "auction-client")]
#[command(about = "Client for a single on-chain timed auction", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(
		short,
		long,
		env = "AUCTION_CONFIG",
		default_value = "config/example.toml"
	)]
	pub config: PathBuf,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long)]
	pub log_level: Option<String>,

	/// Subcommand to execute
	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
	/// Follow the auction and read intents from stdin
	#[command(about = "Follow the auction live; type `help` for commands")]
	Watch,

	/// Place a bid and wait for confirmation
	Bid {
		/// Cumulative bid total in ether, e.g. 0.002
		#[arg(short, long)]
		amount: String,

		/// Message attached to the bid
		#[arg(short, long, default_value = "")]
		message: String,
	},

	/// Register a display name for the wallet account
	Register {
		#[arg(short, long)]
		name: String,
	},

	/// Print the current auction state once
	Status,

	/// Validate the configuration file
	Validate,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_to_watch() {
		let args = Args::try_parse_from(["auction-client"]).unwrap();
		assert!(args.command.is_none());
		assert_eq!(args.config, PathBuf::from("config/example.toml"));
	}

	#[test]
	fn test_bid_command() {
		let args = Args::try_parse_from([
			"auction-client",
			"--config",
			"my.toml",
			"bid",
			"--amount",
			"0.002",
			"-m",
			"hello there",
		])
		.unwrap();

		assert_eq!(
			args.command,
			Some(Command::Bid {
				amount: "0.002".to_string(),
				message: "hello there".to_string()
			})
		);
	}

	#[test]
	fn test_register_requires_name() {
		assert!(Args::try_parse_from(["auction-client", "register"]).is_err());
	}
}
