use anyhow::{Context, Result};
use auction_chain::implementations::evm::alloy::create_chain;
use auction_chain::ChainInterface;
use auction_config::{Config, ConfigLoader};
use auction_core::{AuctionEngine, PresentationInterface};
use auction_service::cli::{Args, Command};
use auction_service::intents::{read_stdin_intents, HELP};
use auction_service::presenter::LogPresenter;
use auction_types::{format_amount, UserFacingError};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = ConfigLoader::new()
		.with_file(&args.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", args.config))?;

	let log_level = args
		.log_level
		.clone()
		.unwrap_or_else(|| config.client.log_level.clone());
	setup_tracing(&log_level)?;

	match args.command.unwrap_or(Command::Watch) {
		Command::Watch => watch(&config).await,
		Command::Bid { amount, message } => bid(&config, &amount, &message).await,
		Command::Register { name } => register(&config, &name).await,
		Command::Status => status(&config).await,
		Command::Validate => validate(&config),
	}
}

fn build_engine(config: &Config) -> Result<AuctionEngine> {
	let chain: Arc<dyn ChainInterface> =
		Arc::from(create_chain(config).context("Failed to create chain client")?);
	let presenter: Arc<dyn PresentationInterface> = Arc::new(LogPresenter::new());

	AuctionEngine::new(config, chain, presenter).context("Failed to build auction engine")
}

async fn watch(config: &Config) -> Result<()> {
	info!("Starting {}", config.client.name);
	info!(
		"Following auction {} on {}",
		config.contract.address, config.network.chain_name
	);

	let engine = build_engine(config)?;

	let (tx, rx) = mpsc::unbounded_channel();
	let reader = tokio::spawn(read_stdin_intents(tx));
	println!("{}", HELP);

	let result = engine.run(rx, setup_shutdown_signal()).await;
	reader.abort();

	result.map_err(|e| anyhow::anyhow!(e.user_message()))?;
	info!("{} stopped", config.client.name);
	Ok(())
}

async fn bid(config: &Config, amount: &str, message: &str) -> Result<()> {
	let engine = build_engine(config)?;
	engine
		.load_snapshot()
		.await
		.map_err(|e| anyhow::anyhow!(e.user_message()))?;

	let result = engine.place_bid(amount, message).await;
	engine.stop_sync().await;

	let submission = result.map_err(|e| anyhow::anyhow!(e.user_message()))?;
	println!(
		"Bid confirmed: total {} {}, sent {} {} in {}",
		format_amount(submission.total),
		config.network.currency_symbol,
		format_amount(submission.amount_sent),
		config.network.currency_symbol,
		submission.receipt.hash
	);
	Ok(())
}

async fn register(config: &Config, name: &str) -> Result<()> {
	let engine = build_engine(config)?;

	let result = engine.register(name).await;
	engine.stop_sync().await;

	let receipt = result.map_err(|e| anyhow::anyhow!(e.user_message()))?;
	println!("Name registered in {}", receipt.hash);
	Ok(())
}

async fn status(config: &Config) -> Result<()> {
	let engine = build_engine(config)?;
	engine
		.load_snapshot()
		.await
		.map_err(|e| anyhow::anyhow!(e.user_message()))?;

	let view = engine.view().await;
	println!("Current bid:  {}", view.current_bid);
	if let Some(bidder) = &view.current_bidder {
		match &view.bidder_display_name {
			Some(name) => println!("Bidder:       {} ({})", name, bidder),
			None => println!("Bidder:       {}", bidder),
		}
	}
	if let Some(message) = &view.current_message {
		println!("Message:      {}", message);
	}
	println!("Next minimum: {}", view.next_min_bid);
	println!("Remaining:    {}", view.remaining);
	Ok(())
}

fn validate(config: &Config) -> Result<()> {
	let address = config.contract_address()?;
	let min_increment = config.auction.min_increment_wei()?;

	println!("Configuration is valid");
	println!("Client name: {}", config.client.name);
	println!(
		"Network: {} (chain id {})",
		config.network.chain_name, config.network.chain_id
	);
	println!("Contract: {}", address);
	println!(
		"Minimum increment: {} {}",
		format_amount(min_increment),
		config.network.currency_symbol
	);
	if config.wallet.private_key.is_none() && config.wallet.rpc_url.is_none() {
		println!("No wallet configured; the client will run read-only");
	}
	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.try_init()
		.context("Failed to initialize tracing")?;

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			warn!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				warn!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
