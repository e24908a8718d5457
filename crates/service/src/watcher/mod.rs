//! Transfer watching
//!
//! Each [`Watcher`] owns one [`TransferState`] driven by a single task. Three
//! observer tasks poll the source chain, the bridge relay and the destination
//! chain, and feed what they see to the driver over a channel. Observers read
//! the current state through a `watch` channel and only poll while the phase
//! needs them.

pub mod monitor;
pub mod state;

pub use monitor::{PollOutcome, PollTracker, PollingConfig};
pub use state::{Applied, Observation, ObserverKind, TransferState, Transition, TxStatus};

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use movr_adapters::{AdapterRegistry, ChainRegistry};
use movr_types::{
	BridgeAdapter, Chain, ChainClient, HandlerError, Token, TransferEvent, TransferEventKind,
	TransferHandle, TransferKey, TransferPhase, TxRef, WatchError, WatchResult,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event_bus::{EventBus, EventHandler, FnHandler, HandlerDiagnostic};
use crate::ledger::TransferLedger;

const TRACING_TARGET: &str = "movr::watcher";
const OBSERVATION_BUFFER: usize = 32;

/// Creates watch sessions for submitted transfers
pub struct TransferWatcher {
	chains: Arc<ChainRegistry>,
	adapters: Arc<AdapterRegistry>,
	ledger: Arc<TransferLedger>,
	polling: PollingConfig,
}

impl TransferWatcher {
	pub fn new(
		chains: Arc<ChainRegistry>,
		adapters: Arc<AdapterRegistry>,
		ledger: Arc<TransferLedger>,
		polling: PollingConfig,
	) -> Self {
		Self {
			chains,
			adapters,
			ledger,
			polling,
		}
	}

	/// Prepare a watch session; polling begins at [`Watcher::start`]
	pub fn watch(
		&self,
		source_tx: &TxRef,
		source_chain: &Chain,
		destination_chain: &Chain,
		token: &Token,
		bridge_name: &str,
	) -> WatchResult<Watcher> {
		if source_chain == destination_chain {
			return Err(WatchError::SameChain {
				chain_id: source_chain.chain_id,
			});
		}

		let adapter = self
			.adapters
			.get(bridge_name)
			.ok_or_else(|| WatchError::UnknownBridge {
				bridge_name: bridge_name.to_string(),
			})?;
		let source_client = self
			.chains
			.client(source_chain.chain_id)
			.ok_or(WatchError::UnknownChain {
				chain_id: source_chain.chain_id,
			})?;
		let destination_client = self
			.chains
			.client(destination_chain.chain_id)
			.ok_or(WatchError::UnknownChain {
				chain_id: destination_chain.chain_id,
			})?;

		let handle = self.ledger.track(TransferHandle {
			source_tx: source_tx.clone(),
			source_chain: source_chain.clone(),
			destination_chain: destination_chain.clone(),
			token: token.clone(),
			bridge_name: adapter.bridge_name().to_string(),
			completion_protocol: adapter.completion_protocol(source_chain, destination_chain),
		});

		let initial = TransferState::new(
			handle.source_tx.clone(),
			handle.completion_protocol,
			adapter.min_confirmations(source_chain),
			adapter.min_confirmations(destination_chain),
		);
		let (state_tx, state_rx) = watch::channel(initial);

		let session_id = Uuid::new_v4().to_string();
		let (bus, diagnostics) = EventBus::new(session_id.clone());

		debug!(
			target: TRACING_TARGET,
			session_id = %session_id,
			source_tx = %handle.source_tx,
			bridge = %handle.bridge_name,
			protocol = ?handle.completion_protocol,
			"Created watch session"
		);

		Ok(Watcher {
			context: Arc::new(SessionContext {
				session_id,
				handle,
				adapter,
				source_client,
				destination_client,
				ledger: self.ledger.clone(),
				polling: self.polling.clone(),
			}),
			bus: Arc::new(bus),
			state_rx,
			pending: Mutex::new(Some(state_tx)),
			tasks: Mutex::new(Vec::new()),
			diagnostics: Mutex::new(Some(diagnostics)),
		})
	}
}

/// Everything the driver and observers of one session share
struct SessionContext {
	session_id: String,
	handle: TransferHandle,
	adapter: Arc<dyn BridgeAdapter>,
	source_client: Arc<dyn ChainClient>,
	destination_client: Arc<dyn ChainClient>,
	ledger: Arc<TransferLedger>,
	polling: PollingConfig,
}

/// One watch session
///
/// Register handlers with [`Watcher::on`], then call [`Watcher::start`].
/// Handlers added after start receive events from the next transition on.
/// Dropping the watcher stops it.
pub struct Watcher {
	context: Arc<SessionContext>,
	bus: Arc<EventBus>,
	state_rx: watch::Receiver<TransferState>,
	pending: Mutex<Option<watch::Sender<TransferState>>>,
	tasks: Mutex<Vec<JoinHandle<()>>>,
	diagnostics: Mutex<Option<mpsc::UnboundedReceiver<HandlerDiagnostic>>>,
}

impl std::fmt::Debug for Watcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Watcher")
			.field("session_id", &self.context.session_id)
			.field("handle", &self.context.handle)
			.field("phase", &self.state_rx.borrow().phase)
			.finish_non_exhaustive()
	}
}

impl Watcher {
	pub fn session_id(&self) -> &str {
		&self.context.session_id
	}

	pub fn handle(&self) -> &TransferHandle {
		&self.context.handle
	}

	/// Register an async closure for one event kind
	pub fn on<F, Fut>(&self, kind: TransferEventKind, handler: F)
	where
		F: Fn(TransferEvent) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
	{
		self.bus.subscribe(kind, Arc::new(FnHandler::new(handler)));
	}

	pub fn on_handler(&self, kind: TransferEventKind, handler: Arc<dyn EventHandler>) {
		self.bus.subscribe(kind, handler);
	}

	/// Begin polling; emits `SourceTxStarted`
	pub fn start(&self) -> WatchResult<()> {
		let state_tx = self
			.pending
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take()
			.ok_or_else(|| WatchError::AlreadyStarted {
				session_id: self.context.session_id.clone(),
			})?;

		let (observation_tx, observation_rx) = mpsc::channel(OBSERVATION_BUFFER);
		let context = &self.context;

		let tasks = vec![
			tokio::spawn(drive(
				context.clone(),
				self.bus.clone(),
				state_tx,
				observation_rx,
			)),
			tokio::spawn(observe_source(
				context.clone(),
				self.state_rx.clone(),
				observation_tx.clone(),
			)),
			tokio::spawn(observe_relay(
				context.clone(),
				self.state_rx.clone(),
				observation_tx.clone(),
			)),
			tokio::spawn(observe_destination(
				context.clone(),
				self.state_rx.clone(),
				observation_tx,
			)),
		];
		*self.tasks.lock().unwrap_or_else(PoisonError::into_inner) = tasks;

		info!(
			target: TRACING_TARGET,
			session_id = %context.session_id,
			source_tx = %context.handle.source_tx,
			"Watch session started"
		);
		Ok(())
	}

	/// Stop the session; returns once every task has been released
	pub async fn cancel(&self) {
		self.bus.cancel();
		drop(
			self.pending
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.take(),
		);

		let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
		for task in &tasks {
			task.abort();
		}
		for task in tasks {
			// Aborted tasks resolve with a cancellation error
			let _ = task.await;
		}

		info!(
			target: TRACING_TARGET,
			session_id = %self.context.session_id,
			"Watch session cancelled"
		);
	}

	pub fn is_cancelled(&self) -> bool {
		self.bus.is_cancelled()
	}

	pub fn snapshot(&self) -> TransferState {
		self.state_rx.borrow().clone()
	}

	/// Resolve at a terminal phase or once the session is cancelled
	pub async fn wait(&self) -> TransferState {
		let mut state_rx = self.state_rx.clone();
		// Errors only when the driver is gone, i.e. after cancellation
		let _ = state_rx.wait_for(TransferState::is_terminal).await;
		let state = state_rx.borrow().clone();
		state
	}

	/// Handler failures of this session; can be taken once
	pub fn diagnostics(&self) -> Option<mpsc::UnboundedReceiver<HandlerDiagnostic>> {
		self.diagnostics
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take()
	}
}

impl Drop for Watcher {
	fn drop(&mut self) {
		self.bus.cancel();
		for task in self
			.tasks
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.drain(..)
		{
			task.abort();
		}
	}
}

/// Owns the state machine: applies observations in arrival order and emits
/// one event per transition
async fn drive(
	context: Arc<SessionContext>,
	bus: Arc<EventBus>,
	state_tx: watch::Sender<TransferState>,
	mut observations: mpsc::Receiver<Observation>,
) {
	let mut state = state_tx.borrow().clone();
	let mut sequence = 0u64;
	let mut session = LedgerSession::open(context.ledger.clone(), context.handle.key());

	if let Some(transition) = state.begin() {
		state_tx.send_replace(state.clone());
		emit(&context, &bus, &mut sequence, &transition).await;
	}

	let mut armed: Option<(TransferPhase, bool)> = None;
	let mut deadline: Option<Instant> = None;

	while !state.is_terminal() {
		let key = (state.phase, state.claim_tx.is_some());
		if armed != Some(key) {
			armed = Some(key);
			deadline = context
				.polling
				.phase_timeout(&state)
				.map(|limit| Instant::now() + limit);
		}

		let observation = tokio::select! {
			observation = observations.recv() => match observation {
				Some(observation) => observation,
				None => break,
			},
			_ = until(deadline) => Observation::PhaseTimedOut,
		};

		match state.apply(observation) {
			Applied::Ignored => {},
			Applied::Updated => {
				state_tx.send_replace(state.clone());
			},
			Applied::Transitioned(transition) => {
				state_tx.send_replace(state.clone());
				emit(&context, &bus, &mut sequence, &transition).await;
			},
		}
	}

	session.completed = state.phase == TransferPhase::DestinationTxConfirmed;

	debug!(
		target: TRACING_TARGET,
		session_id = %context.session_id,
		phase = %state.phase,
		"Driver finished"
	);
}

/// Counts a running driver in the ledger; released on drop, so aborted
/// sessions are released too
struct LedgerSession {
	ledger: Arc<TransferLedger>,
	key: TransferKey,
	completed: bool,
}

impl LedgerSession {
	fn open(ledger: Arc<TransferLedger>, key: TransferKey) -> Self {
		ledger.open_session(&key);
		Self {
			ledger,
			key,
			completed: false,
		}
	}
}

impl Drop for LedgerSession {
	fn drop(&mut self) {
		self.ledger.close_session(&self.key, self.completed);
	}
}

async fn until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

async fn emit(
	context: &SessionContext,
	bus: &EventBus,
	sequence: &mut u64,
	transition: &Transition,
) {
	let Some(kind) = TransferEventKind::for_phase(transition.to) else {
		return;
	};

	match &transition.cause {
		Some(cause) => warn!(
			target: TRACING_TARGET,
			session_id = %context.session_id,
			from = %transition.from,
			cause = %cause,
			"Transfer failed"
		),
		None => info!(
			target: TRACING_TARGET,
			session_id = %context.session_id,
			from = %transition.from,
			to = %transition.to,
			"Transfer advanced"
		),
	}

	if bus.is_cancelled() {
		return;
	}

	*sequence += 1;
	let event = TransferEvent {
		sequence: *sequence,
		session_id: context.session_id.clone(),
		kind,
		phase: transition.to,
		source_tx: context.handle.source_tx.clone(),
		source_chain_id: context.handle.source_chain.chain_id,
		destination_chain_id: context.handle.destination_chain.chain_id,
		bridge_name: context.handle.bridge_name.clone(),
		tx_ref: transition.tx_ref.clone(),
		confirmations: transition.confirmations,
		cause: transition.cause.clone(),
		emitted_at: Utc::now(),
	};
	bus.publish(&event).await;
}

async fn observe_source(
	context: Arc<SessionContext>,
	state_rx: watch::Receiver<TransferState>,
	observations: mpsc::Sender<Observation>,
) {
	let ctx = context.clone();
	run_observer(
		ObserverKind::Source,
		context,
		state_rx,
		observations,
		|state| state.phase == TransferPhase::SourceTxPending,
		move |state: TransferState| {
			let ctx = ctx.clone();
			async move {
				let status = tx_status(ctx.source_client.as_ref(), &state.source_tx).await?;
				Ok::<_, String>(Some(Observation::SourceTx(status)))
			}
		},
	)
	.await
}

async fn observe_relay(
	context: Arc<SessionContext>,
	state_rx: watch::Receiver<TransferState>,
	observations: mpsc::Sender<Observation>,
) {
	let ctx = context.clone();
	run_observer(
		ObserverKind::Relay,
		context,
		state_rx,
		observations,
		|state| {
			matches!(
				state.phase,
				TransferPhase::SourceTxConfirmed | TransferPhase::ClaimConfirmed
			)
		},
		move |_state: TransferState| {
			let ctx = ctx.clone();
			async move {
				let handle = &ctx.handle;
				let status = ctx
					.adapter
					.relay_status(
						&handle.source_tx,
						&handle.source_chain,
						&handle.destination_chain,
					)
					.await
					.map_err(|e| e.to_string())?;
				Ok::<_, String>(Some(Observation::Relay(status)))
			}
		},
	)
	.await
}

async fn observe_destination(
	context: Arc<SessionContext>,
	state_rx: watch::Receiver<TransferState>,
	observations: mpsc::Sender<Observation>,
) {
	let ctx = context.clone();
	run_observer(
		ObserverKind::Destination,
		context,
		state_rx,
		observations,
		|state| {
			matches!(
				state.phase,
				TransferPhase::ClaimPending | TransferPhase::DestinationTxPending
			)
		},
		move |state: TransferState| {
			let ctx = ctx.clone();
			async move {
				let client = ctx.destination_client.as_ref();
				let observation = match (state.phase, state.claim_tx, state.destination_tx) {
					(TransferPhase::ClaimPending, None, _) => ctx
						.ledger
						.claim_ref(&ctx.handle.key())
						.map(Observation::ClaimSubmitted),
					(TransferPhase::ClaimPending, Some(claim_tx), _) => {
						Some(Observation::ClaimTx(tx_status(client, &claim_tx).await?))
					},
					(TransferPhase::DestinationTxPending, _, Some(destination_tx)) => Some(
						Observation::DestinationTx(tx_status(client, &destination_tx).await?),
					),
					_ => None,
				};
				Ok::<_, String>(observation)
			}
		},
	)
	.await
}

async fn tx_status(client: &dyn ChainClient, tx_ref: &TxRef) -> Result<TxStatus, String> {
	match client.confirmation_depth(tx_ref).await {
		Ok(Some((receipt, confirmations))) => Ok(TxStatus::Included {
			confirmations,
			success: receipt.success,
		}),
		Ok(None) => Ok(TxStatus::Pending),
		Err(e) => Err(e.to_string()),
	}
}

/// Poll while `active` holds for the current state, backing off between
/// polls and waking early when the state changes. Exits at a terminal phase.
async fn run_observer<A, P, Fut>(
	kind: ObserverKind,
	context: Arc<SessionContext>,
	mut state_rx: watch::Receiver<TransferState>,
	observations: mpsc::Sender<Observation>,
	active: A,
	poll: P,
) where
	A: Fn(&TransferState) -> bool,
	P: Fn(TransferState) -> Fut,
	Fut: Future<Output = Result<Option<Observation>, String>>,
{
	let polling = &context.polling;
	let mut tracker = PollTracker::default();

	loop {
		let state = state_rx.borrow_and_update().clone();
		if state.is_terminal() {
			return;
		}
		if !active(&state) {
			if state_rx.changed().await.is_err() {
				return;
			}
			continue;
		}

		tracker.observe_phase(state.phase);
		let outcome = match timeout(polling.request_timeout(), poll(state)).await {
			Ok(Ok(observation)) => {
				if let Some(observation) = observation {
					if observations.send(observation).await.is_err() {
						return;
					}
				}
				tracker.succeeded(polling)
			},
			Ok(Err(error)) => {
				debug!(
					target: TRACING_TARGET,
					session_id = %context.session_id,
					observer = %kind,
					error = %error,
					"Poll failed"
				);
				tracker.failed(polling, error)
			},
			Err(_) => tracker.failed(
				polling,
				format!("request timed out after {}ms", polling.request_timeout_ms),
			),
		};

		match outcome {
			PollOutcome::Continue(delay) => {
				tokio::select! {
					_ = sleep(delay) => {},
					changed = state_rx.changed() => {
						if changed.is_err() {
							return;
						}
					},
				}
			},
			PollOutcome::Exhausted {
				attempts,
				last_error,
			} => {
				warn!(
					target: TRACING_TARGET,
					session_id = %context.session_id,
					observer = %kind,
					attempts,
					error = %last_error,
					"Polling exhausted"
				);
				let _ = observations
					.send(Observation::PollingExhausted {
						observer: kind,
						attempts,
						last_error,
					})
					.await;
				return;
			},
		}
	}
}
