//! Configuration types for the auction client.

use auction_types::{parse_amount, Address, U256};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Complete client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Client identity and logging
	pub client: ClientSettings,
	/// The single network the client is bound to
	pub network: NetworkConfig,
	/// Auction contract location
	pub contract: ContractConfig,
	/// Signing provider settings
	#[serde(default)]
	pub wallet: WalletConfig,
	/// Bid rules
	#[serde(default)]
	pub auction: AuctionConfig,
	/// Event ingestion tuning
	#[serde(default)]
	pub ingestion: IngestionConfig,
	/// Presentation settings
	#[serde(default)]
	pub presentation: PresentationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientSettings {
	/// Client name for logging
	pub name: String,
	/// Default log level, overridden by the CLI or environment
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// Network binding, also used as the payload for `wallet_addEthereumChain`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Chain ID the client must operate on
	pub chain_id: u64,
	/// Human readable chain name
	pub chain_name: String,
	/// RPC endpoint used for reads and log polling
	pub rpc_url: String,
	/// Block explorer shown by the wallet when adding the network
	pub block_explorer_url: Option<String>,
	#[serde(default = "default_currency_name")]
	pub currency_name: String,
	#[serde(default = "default_currency_symbol")]
	pub currency_symbol: String,
	#[serde(default = "default_currency_decimals")]
	pub currency_decimals: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractConfig {
	/// Auction contract address
	pub address: String,
}

/// Wallet settings. With neither field set, write operations are unavailable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Hex private key for a local signer
	pub private_key: Option<String>,
	/// Endpoint of an external wallet that signs `eth_sendTransaction` itself.
	/// Defaults to the network RPC when a private key is configured.
	pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuctionConfig {
	/// Minimum amount a new bid must exceed the current bid by, in ether
	#[serde(default = "default_min_increment")]
	pub min_increment: String,
	#[serde(default = "default_max_message_length")]
	pub max_message_length: usize,
	#[serde(default = "default_max_name_length")]
	pub max_name_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
	/// Pending refresh items fetched per drain batch
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
	/// Pause between drain batches
	#[serde(default = "default_batch_delay_ms")]
	pub batch_delay_ms: u64,
	/// Log polling interval for the event subscription
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
	/// Interval of the stale-cache refresh scan
	#[serde(default = "default_refresh_interval_secs")]
	pub refresh_interval_secs: u64,
	/// First block to read logs from (latest when unset)
	pub start_block: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresentationConfig {
	/// How long a status banner stays visible
	#[serde(default = "default_notice_duration_secs")]
	pub notice_duration_secs: u64,
	/// Spot price endpoint returning `{"data":{"amount":"..."}}`
	pub price_feed_url: Option<String>,
	#[serde(default = "default_price_refresh_secs")]
	pub price_refresh_secs: u64,
}

impl Config {
	pub fn contract_address(&self) -> Result<Address, ConfigError> {
		self.contract.address.parse().map_err(|e| {
			ConfigError::ValidationError(format!(
				"Invalid contract address {}: {}",
				self.contract.address, e
			))
		})
	}

	/// Wallet endpoint, falling back to the network RPC for local signers.
	pub fn wallet_rpc_url(&self) -> Option<&str> {
		match (&self.wallet.rpc_url, &self.wallet.private_key) {
			(Some(url), _) => Some(url.as_str()),
			(None, Some(_)) => Some(self.network.rpc_url.as_str()),
			(None, None) => None,
		}
	}
}

impl AuctionConfig {
	pub fn min_increment_wei(&self) -> Result<U256, ConfigError> {
		parse_amount(&self.min_increment)
			.map_err(|e| ConfigError::ValidationError(format!("auction.min_increment: {}", e)))
	}
}

impl Default for AuctionConfig {
	fn default() -> Self {
		Self {
			min_increment: default_min_increment(),
			max_message_length: default_max_message_length(),
			max_name_length: default_max_name_length(),
		}
	}
}

impl Default for IngestionConfig {
	fn default() -> Self {
		Self {
			batch_size: default_batch_size(),
			batch_delay_ms: default_batch_delay_ms(),
			poll_interval_secs: default_poll_interval_secs(),
			refresh_interval_secs: default_refresh_interval_secs(),
			start_block: None,
		}
	}
}

impl Default for PresentationConfig {
	fn default() -> Self {
		Self {
			notice_duration_secs: default_notice_duration_secs(),
			price_feed_url: None,
			price_refresh_secs: default_price_refresh_secs(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_currency_name() -> String {
	"Ether".to_string()
}

fn default_currency_symbol() -> String {
	"ETH".to_string()
}

fn default_currency_decimals() -> u8 {
	18
}

fn default_min_increment() -> String {
	"0.0004".to_string()
}

fn default_max_message_length() -> usize {
	256
}

fn default_max_name_length() -> usize {
	32
}

fn default_batch_size() -> usize {
	10
}

fn default_batch_delay_ms() -> u64 {
	100
}

fn default_poll_interval_secs() -> u64 {
	3
}

fn default_refresh_interval_secs() -> u64 {
	30
}

fn default_notice_duration_secs() -> u64 {
	5
}

fn default_price_refresh_secs() -> u64 {
	60
}
