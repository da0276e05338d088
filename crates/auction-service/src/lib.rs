//! Command-line front end for the auction client.
//!
//! # Components
//!
//! - `cli`: command-line arguments and subcommands
//! - `intents`: parsing of commands typed while watching the auction
//! - `presenter`: presentation adapter that writes views and notices to the log

pub mod cli;
pub mod intents;
pub mod presenter;
