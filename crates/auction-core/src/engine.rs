//! Auction engine wiring ingestion, submission, the countdown and the
//! presentation adapter into one session.

use crate::banner::StatusBanner;
use crate::clock::{Countdown, CountdownClock};
use crate::presenter::{PresentationInterface, RenderView};
use crate::price::PriceFeed;
use crate::session::Session;
use crate::EngineError;
use auction_chain::ChainInterface;
use auction_config::Config;
use auction_delivery::{BidRules, BidSubmission, SubmissionCoordinator, SubmissionError};
use auction_discovery::{BidIngestionPipeline, IngestionSettings};
use auction_state::AuctionStateStore;
use auction_types::{
	format_amount, parse_amount, Address, ChainEvent, TransactionReceipt, UserFacingError, U256,
};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Something the user asked for through the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
	Connect,
	Disconnect,
	Bid { amount: String, message: String },
	Register { name: String },
	Refresh,
	Quit,
}

/// Banner text of a finished submission, or why it failed.
type SubmissionOutcome = Result<String, EngineError>;

#[derive(Debug, Clone)]
struct EngineSettings {
	currency_symbol: String,
	refresh_interval: Duration,
	price_refresh: Duration,
}

pub struct AuctionEngine {
	chain: Arc<dyn ChainInterface>,
	store: Arc<AuctionStateStore>,
	pipeline: Arc<BidIngestionPipeline>,
	coordinator: Arc<SubmissionCoordinator>,
	presenter: Arc<dyn PresentationInterface>,
	banner: StatusBanner,
	price_feed: Option<PriceFeed>,
	settings: EngineSettings,
	session: RwLock<Session>,
	countdown: RwLock<Option<Countdown>>,
	usd_price: RwLock<Option<f64>>,
	clock_task: Mutex<Option<JoinHandle<()>>>,
	event_tx: mpsc::UnboundedSender<ChainEvent>,
	event_rx: Mutex<mpsc::UnboundedReceiver<ChainEvent>>,
	countdown_tx: mpsc::UnboundedSender<Countdown>,
	countdown_rx: Mutex<mpsc::UnboundedReceiver<Countdown>>,
	/// Submissions waiting for confirmation.
	submissions: Mutex<JoinSet<()>>,
	in_flight: AtomicUsize,
	outcome_tx: mpsc::UnboundedSender<SubmissionOutcome>,
	outcome_rx: Mutex<mpsc::UnboundedReceiver<SubmissionOutcome>>,
}

impl AuctionEngine {
	pub fn new(
		config: &Config,
		chain: Arc<dyn ChainInterface>,
		presenter: Arc<dyn PresentationInterface>,
	) -> Result<Self, EngineError> {
		let store = Arc::new(AuctionStateStore::new());
		let rules = BidRules::try_from(&config.auction)?;

		let pipeline = Arc::new(BidIngestionPipeline::new(
			chain.clone(),
			store.clone(),
			IngestionSettings::from(&config.ingestion),
		));
		let coordinator = Arc::new(SubmissionCoordinator::new(
			chain.clone(),
			store.clone(),
			rules,
		));

		let price_feed = match &config.presentation.price_feed_url {
			Some(url) => match PriceFeed::new(url.clone()) {
				Ok(feed) => Some(feed),
				Err(e) => {
					warn!("Price conversion disabled: {}", e);
					None
				}
			},
			None => None,
		};

		let banner = StatusBanner::new(
			presenter.clone(),
			Duration::from_secs(config.presentation.notice_duration_secs),
		);

		let (event_tx, event_rx) = mpsc::unbounded_channel();
		let (countdown_tx, countdown_rx) = mpsc::unbounded_channel();
		let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

		Ok(Self {
			chain,
			store,
			pipeline,
			coordinator,
			presenter,
			banner,
			price_feed,
			settings: EngineSettings {
				currency_symbol: config.network.currency_symbol.clone(),
				refresh_interval: Duration::from_secs(config.ingestion.refresh_interval_secs.max(1)),
				price_refresh: Duration::from_secs(config.presentation.price_refresh_secs.max(1)),
			},
			session: RwLock::new(Session::default()),
			countdown: RwLock::new(None),
			usd_price: RwLock::new(None),
			clock_task: Mutex::new(None),
			event_tx,
			event_rx: Mutex::new(event_rx),
			countdown_tx,
			countdown_rx: Mutex::new(countdown_rx),
			submissions: Mutex::new(JoinSet::new()),
			in_flight: AtomicUsize::new(0),
			outcome_tx,
			outcome_rx: Mutex::new(outcome_rx),
		})
	}

	pub fn store(&self) -> &Arc<AuctionStateStore> {
		&self.store
	}

	pub async fn session(&self) -> Session {
		self.session.read().await.clone()
	}

	/// Reads the deadline and runs the catch-up scan.
	pub async fn load_snapshot(&self) -> Result<(), EngineError> {
		self.load_deadline().await?;
		self.pipeline.catch_up().await;
		Ok(())
	}

	async fn load_deadline(&self) -> Result<(), EngineError> {
		let deadline = self
			.chain
			.read_deadline()
			.await
			.map_err(|e| EngineError::Initialization(format!("Failed to read deadline: {}", e)))?;
		self.store.set_deadline(deadline).await;

		let reading = CountdownClock::new(deadline).tick(chrono::Utc::now().timestamp());
		*self.countdown.write().await = Some(reading);
		Ok(())
	}

	/// Subscribes to contract events, loads the current state and starts
	/// the countdown. No-op while already syncing.
	///
	/// The subscription is opened before the history scan so a bid mined
	/// during the scan still arrives as an event. Overlap is absorbed by the
	/// store.
	pub async fn start_sync(&self) -> Result<(), EngineError> {
		if self.session.read().await.syncing {
			return Ok(());
		}

		self.load_deadline().await?;

		self.chain
			.subscribe(self.event_tx.clone())
			.await
			.map_err(|e| EngineError::Initialization(format!("Failed to subscribe: {}", e)))?;

		self.pipeline.catch_up().await;

		if let Some(deadline) = self.store.deadline().await {
			let clock = CountdownClock::new(deadline);
			let sender = self.countdown_tx.clone();
			*self.clock_task.lock().await = Some(tokio::spawn(clock.run(sender)));
		}

		self.session.write().await.syncing = true;
		info!("Auction sync started");
		self.render().await;
		Ok(())
	}

	/// Stops the subscription and countdown and drops all cached state.
	pub async fn stop_sync(&self) {
		if let Err(e) = self.chain.unsubscribe().await {
			warn!("Failed to unsubscribe: {}", e);
		}
		if let Some(task) = self.clock_task.lock().await.take() {
			task.abort();
		}

		self.pipeline.clear_pending();
		self.store.reset().await;
		*self.countdown.write().await = None;
		self.session.write().await.syncing = false;
		debug!("Auction sync stopped");
	}

	pub async fn connect(&self) -> Result<Address, EngineError> {
		let caller = self.chain.connect().await?;
		self.session.write().await.connect(caller);

		if !self.session.read().await.syncing {
			self.start_sync().await?;
		}
		Ok(caller)
	}

	pub async fn disconnect(&self) {
		self.stop_sync().await;
		self.session.write().await.reset();
		info!("Session disconnected");
	}

	async fn caller(&self) -> Result<Address, EngineError> {
		let caller = self.session.read().await.caller;
		match caller {
			Some(caller) => Ok(caller),
			None => self.connect().await,
		}
	}

	/// Places a bid for a cumulative total given in ether and waits for it to
	/// confirm.
	pub async fn place_bid(
		&self,
		amount: &str,
		message: &str,
	) -> Result<BidSubmission, EngineError> {
		let (caller, total) = self.prepare_bid(amount).await?;
		Ok(self.coordinator.submit_bid(caller, total, message).await?)
	}

	/// Checks that need no transaction: amount syntax, the countdown and a
	/// connected caller.
	async fn prepare_bid(&self, amount: &str) -> Result<(Address, U256), EngineError> {
		let total = parse_amount(amount).map_err(|e| EngineError::InvalidInput(e.to_string()))?;

		if matches!(*self.countdown.read().await, Some(Countdown::Ended)) {
			return Err(SubmissionError::AuctionEnded.into());
		}

		let caller = self.caller().await?;
		Ok((caller, total))
	}

	pub async fn register(&self, name: &str) -> Result<TransactionReceipt, EngineError> {
		let caller = self.caller().await?;
		Ok(self.coordinator.submit_registration(caller, name).await?)
	}

	/// Dispatches an intent and reports the outcome on the banner. Returns
	/// `false` when the engine should stop.
	///
	/// Bids and registrations are validated here, then handed to a background
	/// task for signing and confirmation. Their outcome is reported when it
	/// arrives through [`AuctionEngine::run`].
	pub async fn handle_intent(&self, intent: UserIntent) -> bool {
		debug!(?intent, "Handling user intent");

		let outcome = match intent {
			UserIntent::Connect => self
				.connect()
				.await
				.map(|caller| format!("Connected as {}", caller)),
			UserIntent::Disconnect => {
				self.disconnect().await;
				Ok("Disconnected".to_string())
			}
			UserIntent::Bid { amount, message } => match self.prepare_bid(&amount).await {
				Ok((caller, total)) => {
					let coordinator = self.coordinator.clone();
					let symbol = self.settings.currency_symbol.clone();
					self.spawn_submission(async move {
						coordinator
							.submit_bid(caller, total, &message)
							.await
							.map(|bid| {
								format!(
									"Bid of {} {} confirmed ({} {} sent)",
									format_amount(bid.total),
									symbol,
									format_amount(bid.amount_sent),
									symbol
								)
							})
							.map_err(EngineError::from)
					})
					.await;
					self.banner.info("Bid submitted, waiting for confirmation...");
					self.render().await;
					return true;
				}
				Err(e) => Err(e),
			},
			UserIntent::Register { name } => match self.caller().await {
				Ok(caller) => {
					let coordinator = self.coordinator.clone();
					self.spawn_submission(async move {
						coordinator
							.submit_registration(caller, &name)
							.await
							.map(|_| format!("Name '{}' registered", name.trim()))
							.map_err(EngineError::from)
					})
					.await;
					self.banner.info("Registration submitted, waiting for confirmation...");
					self.render().await;
					return true;
				}
				Err(e) => Err(e),
			},
			UserIntent::Refresh => {
				self.pipeline.refresh().await;
				self.render().await;
				return true;
			}
			UserIntent::Quit => return false,
		};

		self.report(outcome);
		self.render().await;
		true
	}

	fn report(&self, outcome: Result<String, EngineError>) {
		match outcome {
			Ok(message) => self.banner.success(&message),
			Err(e) => {
				warn!("Intent failed: {}", e);
				self.banner.error(&e.user_message());
			}
		}
	}

	async fn spawn_submission<F>(&self, submission: F)
	where
		F: Future<Output = SubmissionOutcome> + Send + 'static,
	{
		let outcomes = self.outcome_tx.clone();
		self.in_flight.fetch_add(1, Ordering::SeqCst);
		self.submissions.lock().await.spawn(async move {
			let _ = outcomes.send(submission.await);
		});
	}

	/// Number of submissions still waiting for confirmation.
	pub fn pending_submissions(&self) -> usize {
		self.in_flight.load(Ordering::SeqCst)
	}

	async fn refresh_price(&self) {
		let Some(feed) = &self.price_feed else {
			return;
		};
		match feed.fetch_usd().await {
			Ok(price) => *self.usd_price.write().await = Some(price),
			Err(e) => debug!("Price refresh failed: {}", e),
		}
	}

	/// Builds the current view and hands it to the presenter.
	pub async fn render(&self) {
		let view = self.view().await;
		self.presenter.render(&view);
	}

	pub async fn view(&self) -> RenderView {
		let snapshot = self.store.snapshot().await;
		let countdown = *self.countdown.read().await;
		let price = *self.usd_price.read().await;
		let account = self.session.read().await.caller.map(|a| a.to_string());

		RenderView::build(
			&snapshot,
			countdown,
			self.coordinator.rules().min_increment,
			price,
			&self.settings.currency_symbol,
		)
		.with_account(account)
	}

	/// Next bid floor for the current state.
	pub async fn next_min_bid(&self) -> U256 {
		let current = self.store.snapshot().await.current_bid();
		auction_delivery::next_min_bid(current, self.coordinator.rules().min_increment)
	}

	/// Runs the session until `shutdown` resolves or a `Quit` intent arrives.
	///
	/// `Quit` lets pending submissions report their confirmation first;
	/// `shutdown` abandons them.
	pub async fn run<F>(
		&self,
		mut intents: mpsc::UnboundedReceiver<UserIntent>,
		shutdown: F,
	) -> Result<(), EngineError>
	where
		F: Future<Output = ()>,
	{
		self.start_sync().await?;

		let mut events = self.event_rx.lock().await;
		let mut readings = self.countdown_rx.lock().await;
		let mut outcomes = self.outcome_rx.lock().await;

		let period = self.settings.refresh_interval;
		let mut refresh = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
		let mut price = tokio::time::interval(self.settings.price_refresh);
		let mut intents_open = true;
		let mut quitting = false;

		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				biased;

				_ = &mut shutdown => {
					info!("Shutting down auction engine");
					break;
				}

				Some(event) = events.recv() => {
					let id = event.id();
					if let Err(e) = self.pipeline.handle_event(event).await {
						warn!(%id, "Failed to handle chain event: {}", e);
					}
					self.render().await;
				}

				Some(reading) = readings.recv() => {
					let was_ended = matches!(*self.countdown.read().await, Some(Countdown::Ended));
					*self.countdown.write().await = Some(reading);
					if reading.is_ended() && !was_ended {
						self.banner.info("The auction has ended.");
					}
					self.render().await;
				}

				Some(outcome) = outcomes.recv() => {
					self.in_flight.fetch_sub(1, Ordering::SeqCst);
					while self.submissions.lock().await.try_join_next().is_some() {}
					self.report(outcome);
					self.render().await;
					if quitting && self.pending_submissions() == 0 {
						info!("Pending submissions settled, quitting");
						break;
					}
				}

				_ = refresh.tick() => {
					if self.session.read().await.syncing {
						self.pipeline.refresh().await;
						self.render().await;
					}
				}

				_ = price.tick(), if self.price_feed.is_some() => {
					self.refresh_price().await;
					self.render().await;
				}

				intent = intents.recv(), if intents_open => match intent {
					Some(intent) => {
						if !self.handle_intent(intent).await {
							let pending = self.pending_submissions();
							if pending == 0 {
								info!("Quit requested");
								break;
							}
							info!(pending, "Quit requested, waiting for pending submissions");
							quitting = true;
							intents_open = false;
						}
					}
					None => intents_open = false,
				},
			}
		}

		self.stop_sync().await;

		let abandoned = self.in_flight.swap(0, Ordering::SeqCst);
		if abandoned > 0 {
			warn!(abandoned, "Stopped waiting for submitted transactions");
		}
		self.submissions.lock().await.abort_all();
		Ok(())
	}
}
