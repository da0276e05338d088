//! Alloy-backed implementation of the auction chain interface.
//!
//! Reads and log polling go through a plain HTTP provider. Writes go through a
//! second provider that either signs locally with a configured key or forwards
//! `eth_sendTransaction` to an external wallet endpoint that holds the key.

use crate::contract::IBidBoard;
use crate::{ChainError, ChainInterface};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolEvent;
use alloy::transports::TransportError;
use async_trait::async_trait;
use auction_config::Config;
use auction_types::{BidRecord, ChainEvent, EventId, TransactionHandle, TransactionReceipt};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Wallet error code for "unrecognized chain" (EIP-3085).
const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Parameters for `wallet_addEthereumChain`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddChainParams {
	chain_id: String,
	chain_name: String,
	rpc_urls: Vec<String>,
	native_currency: NativeCurrency,
	#[serde(skip_serializing_if = "Option::is_none")]
	block_explorer_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
struct NativeCurrency {
	name: String,
	symbol: String,
	decimals: u8,
}

/// How writes are signed.
#[derive(Clone)]
enum WalletKind {
	/// Key held in process; the signer address is known up front.
	Local(Address),
	/// Key held by the endpoint; the account comes from `eth_accounts`.
	External,
}

struct WalletProvider {
	provider: DynProvider,
	kind: WalletKind,
}

/// Auction chain client built on alloy providers.
pub struct AlloyChain {
	/// Provider for reads and log polling.
	provider: DynProvider,
	/// Provider for writes, absent when no wallet is configured.
	wallet: Option<WalletProvider>,
	contract_address: Address,
	chain_params: AddChainParams,
	chain_id: u64,
	poll_interval: Duration,
	start_block: Option<u64>,
	/// Account resolved by the last successful `connect`.
	account: RwLock<Option<Address>>,
	is_monitoring: Arc<AtomicBool>,
	stop_signal: Arc<Mutex<Option<mpsc::Sender<()>>>>,
}

impl AlloyChain {
	pub fn new(config: &Config) -> Result<Self, ChainError> {
		let rpc_url = config
			.network
			.rpc_url
			.parse()
			.map_err(|e| ChainError::Connection(format!("Invalid RPC URL: {}", e)))?;
		let provider = ProviderBuilder::new().connect_http(rpc_url).erased();

		let wallet = match config.wallet_rpc_url() {
			Some(url) => Some(Self::wallet_provider(config, url)?),
			None => None,
		};

		Self::with_providers(config, provider, wallet)
	}

	fn with_providers(
		config: &Config,
		provider: DynProvider,
		wallet: Option<WalletProvider>,
	) -> Result<Self, ChainError> {
		let contract_address = config
			.contract_address()
			.map_err(|e| ChainError::Connection(e.to_string()))?;

		let network = &config.network;
		let chain_params = AddChainParams {
			chain_id: format!("0x{:x}", network.chain_id),
			chain_name: network.chain_name.clone(),
			rpc_urls: vec![network.rpc_url.clone()],
			native_currency: NativeCurrency {
				name: network.currency_name.clone(),
				symbol: network.currency_symbol.clone(),
				decimals: network.currency_decimals,
			},
			block_explorer_urls: network.block_explorer_url.clone().map(|url| vec![url]),
		};

		Ok(Self {
			provider,
			wallet,
			contract_address,
			chain_params,
			chain_id: network.chain_id,
			poll_interval: Duration::from_secs(config.ingestion.poll_interval_secs),
			start_block: config.ingestion.start_block,
			account: RwLock::new(None),
			is_monitoring: Arc::new(AtomicBool::new(false)),
			stop_signal: Arc::new(Mutex::new(None)),
		})
	}

	fn wallet_provider(config: &Config, url: &str) -> Result<WalletProvider, ChainError> {
		let url = url
			.parse()
			.map_err(|e| ChainError::Connection(format!("Invalid wallet URL: {}", e)))?;

		match &config.wallet.private_key {
			Some(key) => {
				let signer: PrivateKeySigner = key
					.parse()
					.map_err(|e| ChainError::Connection(format!("Invalid private key: {}", e)))?;
				let address = signer.address();
				let provider = ProviderBuilder::new()
					.wallet(EthereumWallet::from(signer))
					.connect_http(url)
					.erased();
				Ok(WalletProvider {
					provider,
					kind: WalletKind::Local(address),
				})
			}
			None => Ok(WalletProvider {
				provider: ProviderBuilder::new().connect_http(url).erased(),
				kind: WalletKind::External,
			}),
		}
	}

	fn contract(&self) -> IBidBoard::IBidBoardInstance<DynProvider> {
		IBidBoard::new(self.contract_address, self.provider.clone())
	}

	fn wallet(&self) -> Result<&WalletProvider, ChainError> {
		self.wallet.as_ref().ok_or(ChainError::NoWalletAvailable)
	}

	/// The signing account, resolving it on first use.
	async fn account(&self) -> Result<Address, ChainError> {
		if let Some(account) = *self.account.read().await {
			return Ok(account);
		}
		self.connect().await
	}

	async fn resolve_account(&self, wallet: &WalletProvider) -> Result<Address, ChainError> {
		match wallet.kind {
			WalletKind::Local(address) => Ok(address),
			WalletKind::External => {
				let accounts = wallet
					.provider
					.get_accounts()
					.await
					.map_err(|e| ChainError::from_wallet_failure(e.to_string()))?;
				accounts
					.first()
					.copied()
					.ok_or(ChainError::NoWalletAvailable)
			}
		}
	}

	async fn switch_chain(&self, provider: &DynProvider) -> Result<(), TransportError> {
		let params = vec![serde_json::json!({ "chainId": self.chain_params.chain_id })];
		provider
			.raw_request::<_, serde_json::Value>("wallet_switchEthereumChain".into(), params)
			.await
			.map(|_| ())
	}

	async fn add_chain(&self, provider: &DynProvider) -> Result<(), TransportError> {
		let params = vec![self.chain_params.clone()];
		provider
			.raw_request::<_, serde_json::Value>("wallet_addEthereumChain".into(), params)
			.await
			.map(|_| ())
	}

	fn parse_bid_log(log: &Log) -> Option<ChainEvent> {
		let id = EventId::Log {
			tx_hash: log.transaction_hash?,
			log_index: log.log_index?,
		};

		match log.topics().first() {
			Some(sig) if *sig == IBidBoard::NewBid::SIGNATURE_HASH => {
				let decoded = log.log_decode::<IBidBoard::NewBid>().ok()?;
				let event = decoded.inner.data;
				Some(ChainEvent::NewBid {
					id,
					record: BidRecord {
						index: event.bidIndex.saturating_to::<u64>(),
						sender: event.bidder,
						amount: event.amount,
						message: event.content,
					},
				})
			}
			Some(sig) if *sig == IBidBoard::DataUpdated::SIGNATURE_HASH => {
				let decoded = log.log_decode::<IBidBoard::DataUpdated>().ok()?;
				Some(ChainEvent::DataUpdated {
					id,
					data_id: decoded.inner.data.id.saturating_to::<u64>(),
				})
			}
			_ => None,
		}
	}

	/// Polls the contract's logs and forwards decoded events until stopped.
	async fn monitoring_loop(
		provider: DynProvider,
		contract_address: Address,
		mut last_block: u64,
		poll_interval: Duration,
		sender: mpsc::UnboundedSender<ChainEvent>,
		mut stop_rx: mpsc::Receiver<()>,
	) {
		let mut interval = tokio::time::interval(poll_interval);

		loop {
			tokio::select! {
				_ = interval.tick() => {
					let current_block = match provider.get_block_number().await {
						Ok(block) => block,
						Err(e) => {
							tracing::error!("Failed to get block number: {}", e);
							continue;
						}
					};

					if current_block <= last_block {
						continue;
					}

					let filter = Filter::new()
						.address(contract_address)
						.event_signature(vec![
							IBidBoard::NewBid::SIGNATURE_HASH,
							IBidBoard::DataUpdated::SIGNATURE_HASH,
						])
						.from_block(last_block + 1)
						.to_block(current_block);

					let logs = match provider.get_logs(&filter).await {
						Ok(logs) => logs,
						Err(e) => {
							tracing::warn!(
								from = last_block + 1,
								to = current_block,
								"Failed to get logs: {}",
								e
							);
							continue;
						}
					};

					for log in logs {
						match Self::parse_bid_log(&log) {
							Some(event) => {
								if sender.send(event).is_err() {
									tracing::debug!("Event receiver dropped, stopping monitor");
									return;
								}
							}
							None => tracing::warn!(
								tx_hash = ?log.transaction_hash,
								"Skipping undecodable log"
							),
						}
					}

					last_block = current_block;
				}
				_ = stop_rx.recv() => {
					break;
				}
			}
		}
	}
}

/// Reverted view calls mean "no such entry" for index and name lookups.
fn is_revert(error: &alloy::contract::Error) -> bool {
	error.to_string().to_lowercase().contains("revert")
}

#[async_trait]
impl ChainInterface for AlloyChain {
	async fn ensure_network(&self) -> Result<(), ChainError> {
		let provider = match &self.wallet {
			Some(wallet) => &wallet.provider,
			None => &self.provider,
		};

		let current = provider
			.get_chain_id()
			.await
			.map_err(|e| ChainError::Connection(format!("Failed to get chain id: {}", e)))?;
		if current == self.chain_id {
			return Ok(());
		}

		tracing::info!(
			current,
			expected = self.chain_id,
			"Wallet on wrong network, requesting switch"
		);

		if let Err(e) = self.switch_chain(provider).await {
			let unrecognized = e
				.as_error_resp()
				.is_some_and(|payload| payload.code == UNRECOGNIZED_CHAIN_CODE)
				|| e.to_string().to_lowercase().contains("unrecognized chain");
			if !unrecognized {
				return Err(ChainError::NetworkMismatch(e.to_string()));
			}

			tracing::info!(chain = %self.chain_params.chain_name, "Adding network to wallet");
			self.add_chain(provider)
				.await
				.map_err(|e| ChainError::NetworkMismatch(e.to_string()))?;
			self.switch_chain(provider)
				.await
				.map_err(|e| ChainError::NetworkMismatch(e.to_string()))?;
		}

		let current = provider
			.get_chain_id()
			.await
			.map_err(|e| ChainError::Connection(format!("Failed to get chain id: {}", e)))?;
		if current != self.chain_id {
			return Err(ChainError::NetworkMismatch(format!(
				"expected chain {}, wallet reports {}",
				self.chain_id, current
			)));
		}

		Ok(())
	}

	async fn connect(&self) -> Result<Address, ChainError> {
		let wallet = self.wallet()?;
		self.ensure_network().await?;

		let account = self.resolve_account(wallet).await?;
		*self.account.write().await = Some(account);

		tracing::info!(%account, "Wallet connected");
		Ok(account)
	}

	async fn read_bid_at(&self, index: u64) -> Result<Option<BidRecord>, ChainError> {
		match self.contract().bidHistory(U256::from(index)).call().await {
			Ok(entry) => Ok(Some(BidRecord {
				index,
				sender: entry.sender,
				amount: entry.amount,
				message: entry.content,
			})),
			Err(e) if is_revert(&e) => Ok(None),
			Err(e) => Err(ChainError::Read(format!("bidHistory({}): {}", index, e))),
		}
	}

	async fn read_deadline(&self) -> Result<u64, ChainError> {
		let end_time = self
			.contract()
			.endTime()
			.call()
			.await
			.map_err(|e| ChainError::Read(format!("endTime: {}", e)))?;
		u64::try_from(end_time)
			.map_err(|_| ChainError::Read(format!("endTime out of range: {}", end_time)))
	}

	async fn read_contribution(&self, address: Address) -> Result<U256, ChainError> {
		self.contract()
			.fullBids(address)
			.call()
			.await
			.map_err(|e| ChainError::Read(format!("fullBids({}): {}", address, e)))
	}

	async fn read_display_name(&self, address: Address) -> Result<Option<String>, ChainError> {
		match self.contract().addressToName(address).call().await {
			Ok(name) if name.is_empty() => Ok(None),
			Ok(name) => Ok(Some(name)),
			Err(e) if is_revert(&e) => Ok(None),
			Err(e) => Err(ChainError::Read(format!("addressToName({}): {}", address, e))),
		}
	}

	async fn submit_bid(
		&self,
		message: &str,
		amount: U256,
	) -> Result<TransactionHandle, ChainError> {
		let wallet = self.wallet()?;
		let from = self.account().await?;

		let contract = IBidBoard::new(self.contract_address, wallet.provider.clone());
		let pending = contract
			.contribute(message.to_string())
			.from(from)
			.value(amount)
			.send()
			.await
			.map_err(|e| ChainError::from_wallet_failure(e.to_string()))?;

		let handle = TransactionHandle::new(*pending.tx_hash());
		tracing::info!(tx_hash = %handle.short(), %amount, "Submitted bid");
		Ok(handle)
	}

	async fn submit_registration(&self, name: &str) -> Result<TransactionHandle, ChainError> {
		let wallet = self.wallet()?;
		let from = self.account().await?;

		let contract = IBidBoard::new(self.contract_address, wallet.provider.clone());
		let pending = contract
			.register(name.to_string())
			.from(from)
			.send()
			.await
			.map_err(|e| ChainError::from_wallet_failure(e.to_string()))?;

		let handle = TransactionHandle::new(*pending.tx_hash());
		tracing::info!(tx_hash = %handle.short(), "Submitted registration");
		Ok(handle)
	}

	async fn subscribe(&self, sender: mpsc::UnboundedSender<ChainEvent>) -> Result<(), ChainError> {
		if self.is_monitoring.load(Ordering::SeqCst) {
			return Err(ChainError::Subscription("Already subscribed".to_string()));
		}

		let last_block = match self.start_block {
			Some(block) => block.saturating_sub(1),
			None => self.provider.get_block_number().await.map_err(|e| {
				ChainError::Subscription(format!("Failed to get block number: {}", e))
			})?,
		};

		let (stop_tx, stop_rx) = mpsc::channel(1);
		*self.stop_signal.lock().await = Some(stop_tx);

		let provider = self.provider.clone();
		let contract_address = self.contract_address;
		let poll_interval = self.poll_interval;

		tokio::spawn(async move {
			Self::monitoring_loop(
				provider,
				contract_address,
				last_block,
				poll_interval,
				sender,
				stop_rx,
			)
			.await;
		});

		self.is_monitoring.store(true, Ordering::SeqCst);
		tracing::debug!(from_block = last_block + 1, "Subscribed to auction events");
		Ok(())
	}

	async fn unsubscribe(&self) -> Result<(), ChainError> {
		if !self.is_monitoring.load(Ordering::SeqCst) {
			return Ok(());
		}

		if let Some(stop_tx) = self.stop_signal.lock().await.take() {
			let _ = stop_tx.send(()).await;
		}

		self.is_monitoring.store(false, Ordering::SeqCst);
		Ok(())
	}

	async fn await_confirmation(
		&self,
		handle: &TransactionHandle,
	) -> Result<TransactionReceipt, ChainError> {
		tracing::info!(tx_hash = %handle.short(), "Waiting for confirmation");

		loop {
			match self.provider.get_transaction_receipt(handle.hash).await {
				Ok(Some(receipt)) => {
					return Ok(TransactionReceipt {
						hash: receipt.transaction_hash,
						block_number: receipt.block_number.unwrap_or(0),
						success: receipt.status(),
					});
				}
				Ok(None) => {}
				Err(e) => {
					tracing::warn!(
						tx_hash = %handle.short(),
						"Failed to get receipt, retrying: {}",
						e
					);
				}
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

/// Factory function to create the chain client from configuration.
pub fn create_chain(config: &Config) -> Result<Box<dyn ChainInterface>, ChainError> {
	Ok(Box::new(AlloyChain::new(config)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{b256, LogData, B256, U64};
	use alloy::rpc::json_rpc::ErrorPayload;
	use alloy::transports::mock::Asserter;
	use auction_config::ConfigLoader;

	const SEPOLIA: u64 = 11155111;

	fn test_config() -> Config {
		ConfigLoader::new()
			.with_env_prefix("AUCTION_ALLOY_TEST_UNUSED_")
			.load_from_str(
				r#"
[client]
name = "alloy-test"

[network]
chain_id = 11155111
chain_name = "Sepolia"
rpc_url = "https://rpc.sepolia.org"

[contract]
address = "0x1234567890123456789012345678901234567890"

[ingestion]
poll_interval_secs = 1
"#,
			)
			.unwrap()
	}

	/// Chain whose reads and external wallet share one mocked transport.
	fn mocked_chain(asserter: &Asserter) -> AlloyChain {
		let provider = ProviderBuilder::new()
			.connect_mocked_client(asserter.clone())
			.erased();
		let wallet = WalletProvider {
			provider: provider.clone(),
			kind: WalletKind::External,
		};
		AlloyChain::with_providers(&test_config(), provider, Some(wallet)).unwrap()
	}

	fn wallet_error(code: i64, message: &'static str) -> ErrorPayload {
		ErrorPayload {
			code,
			message: message.into(),
			data: None,
		}
	}

	#[tokio::test]
	async fn test_ensure_network_on_expected_chain() {
		let asserter = Asserter::new();
		asserter.push_success(&U64::from(SEPOLIA));
		let chain = mocked_chain(&asserter);

		chain.ensure_network().await.unwrap();
	}

	#[tokio::test]
	async fn test_ensure_network_adds_unknown_chain_then_switches() {
		let asserter = Asserter::new();
		asserter.push_success(&U64::from(1u64));
		asserter.push_failure(wallet_error(4902, "Unrecognized chain ID"));
		// wallet_addEthereumChain, then the retried switch
		asserter.push_success(&serde_json::Value::Null);
		asserter.push_success(&serde_json::Value::Null);
		asserter.push_success(&U64::from(SEPOLIA));
		let chain = mocked_chain(&asserter);

		chain.ensure_network().await.unwrap();
	}

	#[tokio::test]
	async fn test_ensure_network_rejected_switch_is_mismatch() {
		let asserter = Asserter::new();
		asserter.push_success(&U64::from(1u64));
		asserter.push_failure(wallet_error(4001, "User rejected the request."));
		let chain = mocked_chain(&asserter);

		assert!(matches!(
			chain.ensure_network().await,
			Err(ChainError::NetworkMismatch(_))
		));
	}

	#[tokio::test]
	async fn test_ensure_network_failed_add_is_mismatch() {
		let asserter = Asserter::new();
		asserter.push_success(&U64::from(1u64));
		asserter.push_failure(wallet_error(4902, "Unrecognized chain ID"));
		asserter.push_failure(wallet_error(4001, "User rejected the request."));
		let chain = mocked_chain(&asserter);

		assert!(matches!(
			chain.ensure_network().await,
			Err(ChainError::NetworkMismatch(_))
		));
	}

	#[tokio::test]
	async fn test_connect_resolves_external_account() {
		let account = Address::repeat_byte(0x42);
		let asserter = Asserter::new();
		asserter.push_success(&U64::from(SEPOLIA));
		asserter.push_success(&vec![account]);
		let chain = mocked_chain(&asserter);

		assert_eq!(chain.connect().await.unwrap(), account);
		assert_eq!(*chain.account.read().await, Some(account));
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirmation_survives_receipt_errors() {
		let tx_hash = B256::repeat_byte(0x11);
		let asserter = Asserter::new();
		asserter.push_failure_msg("connection reset");
		asserter.push_success(&serde_json::Value::Null);
		asserter.push_success(&serde_json::json!({
			"type": "0x2",
			"status": "0x1",
			"cumulativeGasUsed": "0x5208",
			"logs": [],
			"logsBloom": format!("0x{}", "0".repeat(512)),
			"transactionHash": tx_hash,
			"transactionIndex": "0x0",
			"blockHash": B256::repeat_byte(0x22),
			"blockNumber": "0x10",
			"gasUsed": "0x5208",
			"effectiveGasPrice": "0x1",
			"from": Address::repeat_byte(0x0a),
			"to": Address::repeat_byte(0x0b),
			"contractAddress": null
		}));
		let chain = mocked_chain(&asserter);

		let receipt = chain
			.await_confirmation(&TransactionHandle::new(tx_hash))
			.await
			.unwrap();

		assert_eq!(receipt.hash, tx_hash);
		assert_eq!(receipt.block_number, 16);
		assert!(receipt.success);
	}

	fn rpc_log(data: LogData) -> Log {
		Log {
			inner: alloy::primitives::Log {
				address: Address::repeat_byte(0xaa),
				data,
			},
			transaction_hash: Some(b256!(
				"0x1111111111111111111111111111111111111111111111111111111111111111"
			)),
			log_index: Some(3),
			..Default::default()
		}
	}

	#[test]
	fn test_parse_new_bid_log() {
		let event = IBidBoard::NewBid {
			bidder: Address::repeat_byte(0x0b),
			amount: U256::from(2_000u64),
			content: "hello".to_string(),
			bidIndex: U256::from(7u64),
		};
		let log = rpc_log(event.encode_log_data());

		match AlloyChain::parse_bid_log(&log) {
			Some(ChainEvent::NewBid { id, record }) => {
				assert!(matches!(id, EventId::Log { log_index: 3, .. }));
				assert_eq!(record.index, 7);
				assert_eq!(record.sender, Address::repeat_byte(0x0b));
				assert_eq!(record.amount, U256::from(2_000u64));
				assert_eq!(record.message, "hello");
			}
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[test]
	fn test_parse_data_updated_log() {
		let event = IBidBoard::DataUpdated { id: U256::from(4u64) };
		let log = rpc_log(event.encode_log_data());

		assert!(matches!(
			AlloyChain::parse_bid_log(&log),
			Some(ChainEvent::DataUpdated { data_id: 4, .. })
		));
	}

	#[test]
	fn test_log_without_tx_hash_is_skipped() {
		let event = IBidBoard::DataUpdated { id: U256::from(4u64) };
		let mut log = rpc_log(event.encode_log_data());
		log.transaction_hash = None;

		assert!(AlloyChain::parse_bid_log(&log).is_none());
	}

	#[test]
	fn test_add_chain_params_serialize_camel_case() {
		let params = AddChainParams {
			chain_id: "0xaa36a7".to_string(),
			chain_name: "Sepolia".to_string(),
			rpc_urls: vec!["https://rpc.sepolia.org".to_string()],
			native_currency: NativeCurrency {
				name: "Ether".to_string(),
				symbol: "ETH".to_string(),
				decimals: 18,
			},
			block_explorer_urls: None,
		};

		let json = serde_json::to_value(&params).unwrap();
		assert_eq!(json["chainId"], "0xaa36a7");
		assert_eq!(json["rpcUrls"][0], "https://rpc.sepolia.org");
		assert_eq!(json["nativeCurrency"]["decimals"], 18);
		assert!(json.get("blockExplorerUrls").is_none());
	}
}
