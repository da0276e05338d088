// auction-config/src/lib.rs

use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "AUCTION_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		// Load base configuration from file
		let content = if let Some(file_path) = &self.file_path {
			if !Path::new(file_path).exists() {
				return Err(ConfigError::FileNotFound(file_path.clone()));
			}
			tokio::fs::read_to_string(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		self.load_from_str(&content)
	}

	/// Parses, overrides and validates configuration held in memory.
	pub fn load_from_str(&self, content: &str) -> Result<Config, ConfigError> {
		let substituted_content = substitute_env_vars(content)?;

		let mut config: Config = toml::from_str(&substituted_content)
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		self.apply_env_overrides(&mut config);

		validate_config(&config)?;

		Ok(config)
	}

	fn apply_env_overrides(&self, config: &mut Config) {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			debug!("Overriding log level from environment");
			config.client.log_level = log_level;
		}

		if let Ok(rpc_url) = env::var(format!("{}RPC_URL", self.env_prefix)) {
			debug!("Overriding RPC URL from environment");
			config.network.rpc_url = rpc_url;
		}

		if let Ok(private_key) = env::var(format!("{}PRIVATE_KEY", self.env_prefix)) {
			debug!("Overriding wallet private key from environment");
			config.wallet.private_key = Some(private_key);
		}

		if let Ok(address) = env::var(format!("{}CONTRACT_ADDRESS", self.env_prefix)) {
			debug!("Overriding contract address from environment");
			config.contract.address = address;
		}
	}
}

/// Replaces `${VAR_NAME}` patterns with values from the environment.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let mut result = content.to_string();

	let re = regex::Regex::new(r"\$\{([^}]+)\}")
		.map_err(|e| ConfigError::ParseError(e.to_string()))?;

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
	if config.network.chain_id == 0 {
		return Err(ConfigError::ValidationError(
			"network.chain_id must be greater than zero".to_string(),
		));
	}

	validate_url("network.rpc_url", &config.network.rpc_url)?;
	if let Some(url) = &config.wallet.rpc_url {
		validate_url("wallet.rpc_url", url)?;
	}
	if let Some(url) = &config.presentation.price_feed_url {
		validate_url("presentation.price_feed_url", url)?;
	}

	config.contract_address()?;

	if let Some(key) = &config.wallet.private_key {
		let key_without_prefix = key.strip_prefix("0x").unwrap_or(key);
		if key_without_prefix.len() != 64
			|| !key_without_prefix.chars().all(|c| c.is_ascii_hexdigit())
		{
			return Err(ConfigError::ValidationError(
				"wallet.private_key must be 64 hex characters (32 bytes)".to_string(),
			));
		}
	}

	if config.auction.min_increment_wei()?.is_zero() {
		return Err(ConfigError::ValidationError(
			"auction.min_increment must be greater than zero".to_string(),
		));
	}

	if config.auction.max_message_length == 0 || config.auction.max_name_length == 0 {
		return Err(ConfigError::ValidationError(
			"auction length limits must be greater than zero".to_string(),
		));
	}

	if config.ingestion.batch_size == 0 {
		return Err(ConfigError::ValidationError(
			"ingestion.batch_size must be greater than zero".to_string(),
		));
	}

	if config.ingestion.poll_interval_secs == 0 || config.ingestion.refresh_interval_secs == 0 {
		return Err(ConfigError::ValidationError(
			"ingestion intervals must be greater than zero".to_string(),
		));
	}

	Ok(())
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
	if url.starts_with("http://") || url.starts_with("https://") {
		Ok(())
	} else {
		Err(ConfigError::ValidationError(format!(
			"{} must start with http:// or https://",
			field
		)))
	}
}
