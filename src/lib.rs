//! Movr
//!
//! Cross-chain token transfers: estimate routes across bridge adapters, execute
//! the approval and send transactions of a chosen route, and watch a transfer
//! through its lifecycle until the funds land on the destination chain.
//!
//! ```rust,ignore
//! let mover = MoverBuilder::new()
//!     .with_chain(polygon.clone(), polygon_client)
//!     .with_chain(gnosis.clone(), gnosis_client)
//!     .with_adapter(Arc::new(MyBridge::new()))
//!     .with_signer(wallet)
//!     .build()?;
//!
//! let routes = mover
//!     .estimate(&usdc, &polygon, &gnosis, Amount::new(1_000_000), RouteSelectionPolicy::MaxOutput)
//!     .await?;
//! let handle = mover.send(&usdc, &polygon, &gnosis, &routes[0]).await?;
//! let watcher = mover.watch_handle(&handle)?;
//! watcher.on(TransferEventKind::DestinationTxCompleted, |event| async move {
//!     println!("transfer {} complete", event.source_tx);
//!     Ok(())
//! });
//! watcher.start()?;
//! ```

use std::sync::Arc;

use movr_adapters::ChainRegistryError;
use movr_config::{ConfigLoadError, ConfigValidationError, LogFormat, LoggingSettings};
use thiserror::Error;
use tracing::{debug, info};

// Core domain types
pub use movr_types::{
	chrono, serde_json, AdapterError, AdapterRegistryError, AdapterResult, Amount, BridgeAdapter,
	BridgeQuote, Chain, ChainClient, ChainError, ChainResult, CompletionProtocol, FailureCause,
	HandlerError, RelayStatus, RouteError, RouteQuote, RouteResult, RouteSelectionPolicy,
	RouteValidationError, SignedTransaction, Signer, SignerError, Token, TransactionKind,
	TransferError, TransferEvent, TransferEventKind, TransferHandle, TransferKey, TransferLeg,
	TransferPhase, TransferResult, TxReceipt, TxRef, UnsignedTransaction, WatchError, WatchResult,
};

// Service layer
pub use movr_service::{
	EventHandler, ExecutorConfig, HandlerDiagnostic, PollingConfig, RouteEngine,
	RouteEngineConfig, TransferExecutor, TransferLedger, TransferState, TransferWatcher, Watcher,
};

// Adapters
pub use movr_adapters::{AdapterRegistry, ChainRegistry, JsonRpcChainClient};

// Config
pub use movr_config::{load_config, log_service_info, log_startup_complete, Settings};

pub mod models {
	pub use movr_types::*;
}

pub mod config {
	pub use movr_config::*;
}

pub mod adapters {
	pub use movr_adapters::*;
}

pub mod service {
	pub use movr_service::*;
}

pub mod mocks;

// Re-export external dependencies for adapter implementations
pub use async_trait;

/// Errors assembling a [`Mover`]
#[derive(Debug, Error)]
pub enum MoverError {
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigLoadError),

	#[error("Invalid configuration: {0}")]
	Validation(#[from] ConfigValidationError),

	#[error("Chain registration failed: {0}")]
	ChainRegistry(#[from] ChainRegistryError),

	#[error("Adapter registration failed: {0}")]
	AdapterRegistry(#[from] AdapterRegistryError),

	#[error("Chain client error: {0}")]
	Chain(#[from] ChainError),

	#[error("A signer is required to send and claim transfers")]
	MissingSigner,

	#[error("Failed to initialise tracing: {0}")]
	Tracing(String),
}

/// Initialise the global tracing subscriber from logging settings
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingSettings) -> Result<(), MoverError> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

	let result = match logging.format {
		LogFormat::Json => {
			let subscriber = tracing_subscriber::fmt().json().with_env_filter(env_filter);
			if logging.structured {
				subscriber.with_target(true).with_thread_ids(true).try_init()
			} else {
				subscriber.try_init()
			}
		},
		LogFormat::Pretty => {
			let subscriber = tracing_subscriber::fmt()
				.pretty()
				.with_env_filter(env_filter);
			if logging.structured {
				subscriber.with_target(true).with_thread_ids(true).try_init()
			} else {
				subscriber.try_init()
			}
		},
		LogFormat::Compact => {
			let subscriber = tracing_subscriber::fmt()
				.compact()
				.with_env_filter(env_filter);
			if logging.structured {
				subscriber.with_target(true).with_thread_ids(true).try_init()
			} else {
				subscriber.try_init()
			}
		},
	};
	result.map_err(|e| MoverError::Tracing(e.to_string()))?;

	info!(
		"Logging configuration applied: level={}, format={:?}, structured={}",
		logging.level, logging.format, logging.structured
	);
	Ok(())
}

/// Builder wiring chains, bridge adapters and a signer into a [`Mover`]
#[derive(Default)]
pub struct MoverBuilder {
	settings: Option<Settings>,
	chains: Vec<(Chain, Arc<dyn ChainClient>)>,
	adapters: Vec<Arc<dyn BridgeAdapter>>,
	signer: Option<Arc<dyn Signer>>,
}

impl MoverBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Load `.env`, configuration and logging, and connect every enabled chain over JSON-RPC
	///
	/// Adapters and the signer still have to be supplied before [`MoverBuilder::build`].
	pub fn from_env() -> Result<Self, MoverError> {
		dotenvy::dotenv().ok();
		let settings = load_config()?;

		if let Err(e) = init_tracing(&settings.logging) {
			// Embedding applications may already own the subscriber
			debug!("Tracing not initialised: {}", e);
		}
		log_service_info();
		movr_config::log_settings_summary(&settings);

		Self::new().with_settings(settings).with_configured_chains()
	}

	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = Some(settings);
		self
	}

	pub fn settings(&self) -> Option<&Settings> {
		self.settings.as_ref()
	}

	/// Connect every enabled chain of the current settings through [`JsonRpcChainClient`]
	pub fn with_configured_chains(mut self) -> Result<Self, MoverError> {
		let settings = self.settings.clone().unwrap_or_default();
		for resolved in settings.resolve_chains()? {
			let mut chain = Chain::new(resolved.chain_id, resolved.endpoint.clone());
			if let Some(name) = resolved.name {
				chain = chain.with_name(name);
			}
			let client = JsonRpcChainClient::new(
				resolved.chain_id,
				resolved.endpoint,
				resolved.request_timeout_ms,
			)?;
			self.chains.push((chain, Arc::new(client)));
		}
		Ok(self)
	}

	pub fn with_chain(mut self, chain: Chain, client: Arc<dyn ChainClient>) -> Self {
		self.chains.push((chain, client));
		self
	}

	pub fn with_adapter(mut self, adapter: Arc<dyn BridgeAdapter>) -> Self {
		self.adapters.push(adapter);
		self
	}

	pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
		self.signer = Some(signer);
		self
	}

	pub fn build(self) -> Result<Mover, MoverError> {
		let settings = self.settings.unwrap_or_default();
		settings.validate()?;
		let signer = self.signer.ok_or(MoverError::MissingSigner)?;

		let mut chains = ChainRegistry::new();
		for (chain, client) in self.chains {
			chains.register(chain, client)?;
		}
		let mut adapters = AdapterRegistry::new();
		for adapter in self.adapters {
			adapters.register(adapter)?;
		}

		let chains = Arc::new(chains);
		let adapters = Arc::new(adapters);
		let ledger = Arc::new(TransferLedger::new());

		let route_engine = RouteEngine::new(adapters.clone(), route_engine_config(&settings));
		let executor = TransferExecutor::new(
			chains.clone(),
			adapters.clone(),
			signer,
			ledger.clone(),
			executor_config(&settings),
		);
		let watcher = TransferWatcher::new(
			chains.clone(),
			adapters.clone(),
			ledger,
			polling_config(&settings),
		);

		log_startup_complete(adapters.len(), chains.len());

		Ok(Mover {
			chains,
			adapters,
			route_engine,
			executor: Arc::new(executor),
			watcher: Arc::new(watcher),
		})
	}
}

fn route_engine_config(settings: &Settings) -> RouteEngineConfig {
	RouteEngineConfig {
		adapter_timeout_ms: settings.routing.adapter_timeout_ms,
		quote_ttl_secs: settings.routing.quote_ttl_secs,
	}
}

fn executor_config(settings: &Settings) -> ExecutorConfig {
	ExecutorConfig {
		approval_confirmations: settings.execution.approval_confirmations,
		confirmation_poll_ms: settings.execution.confirmation_poll_ms,
		confirmation_timeout_ms: settings.execution.confirmation_timeout_ms,
	}
}

fn polling_config(settings: &Settings) -> PollingConfig {
	let watcher = &settings.watcher;
	PollingConfig {
		backoff_schedule_ms: watcher.backoff_schedule_ms.clone(),
		max_backoff_ms: watcher.max_backoff_ms,
		max_consecutive_failures: watcher.max_consecutive_failures,
		request_timeout_ms: watcher.request_timeout_ms,
		source_timeout_ms: watcher.source_timeout_secs.saturating_mul(1_000),
		relay_timeout_ms: watcher.relay_timeout_secs.saturating_mul(1_000),
		destination_timeout_ms: watcher.destination_timeout_secs.saturating_mul(1_000),
	}
}

/// Entry point for estimating, sending, claiming and watching transfers
///
/// Cheap to clone; clones share the same registries and transfer ledger.
#[derive(Clone)]
pub struct Mover {
	chains: Arc<ChainRegistry>,
	adapters: Arc<AdapterRegistry>,
	route_engine: RouteEngine,
	executor: Arc<TransferExecutor>,
	watcher: Arc<TransferWatcher>,
}

impl std::fmt::Debug for Mover {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Mover")
			.field("chains", &self.chains.chains())
			.field("bridges", &self.adapters.bridge_names())
			.finish_non_exhaustive()
	}
}

impl Mover {
	pub fn builder() -> MoverBuilder {
		MoverBuilder::new()
	}

	/// Quotes from every bridge serving the chain pair, best first under `policy`
	pub async fn estimate(
		&self,
		token: &Token,
		source_chain: &Chain,
		destination_chain: &Chain,
		amount: Amount,
		policy: RouteSelectionPolicy,
	) -> RouteResult<Vec<RouteQuote>> {
		self.route_engine
			.estimate(token, source_chain, destination_chain, amount, policy)
			.await
	}

	/// Approve and send `route`
	pub async fn send(
		&self,
		token: &Token,
		source_chain: &Chain,
		destination_chain: &Chain,
		route: &RouteQuote,
	) -> TransferResult<TransferHandle> {
		self.executor
			.send(token, source_chain, destination_chain, route)
			.await
	}

	/// Submit the destination claim of a two-step transfer
	pub async fn claim(
		&self,
		source_tx: &TxRef,
		source_chain: &Chain,
		destination_chain: &Chain,
	) -> TransferResult<TxRef> {
		self.executor
			.claim(source_tx, source_chain, destination_chain)
			.await
	}

	/// Create a watch session for a submitted transfer
	pub fn watch(
		&self,
		source_tx: &TxRef,
		source_chain: &Chain,
		destination_chain: &Chain,
		token: &Token,
		bridge_name: &str,
	) -> WatchResult<Watcher> {
		self.watcher.watch(
			source_tx,
			source_chain,
			destination_chain,
			token,
			bridge_name,
		)
	}

	/// Create a watch session for a handle returned by [`Mover::send`]
	pub fn watch_handle(&self, handle: &TransferHandle) -> WatchResult<Watcher> {
		self.watch(
			&handle.source_tx,
			&handle.source_chain,
			&handle.destination_chain,
			&handle.token,
			&handle.bridge_name,
		)
	}

	/// Register a transfer submitted outside this mover so it can be claimed
	pub fn track(&self, handle: TransferHandle) -> TransferHandle {
		self.executor.track(handle)
	}

	/// Drop a transfer that will not be watched to completion
	///
	/// Transfers watched to completion are forgotten automatically.
	pub fn forget(&self, handle: &TransferHandle) -> Option<TransferHandle> {
		self.executor.forget(handle)
	}

	pub fn chains(&self) -> Vec<Chain> {
		self.chains.chains()
	}

	pub fn bridge_names(&self) -> Vec<String> {
		self.adapters.bridge_names()
	}
}
