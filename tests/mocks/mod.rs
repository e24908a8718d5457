//! Shared fixtures for integration tests
//!
//! A [`TestEnv`] wires mock Polygon and Gnosis chains, a mock signer and any
//! number of mock bridges into a [`Mover`] with millisecond-scale timings.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use movr::config::{LogFormat, LoggingSettings, Settings};
use movr::mocks::{MockBridgeAdapter, MockChainClient, MockSigner};
use movr::{
	Chain, HandlerError, Mover, MoverBuilder, Token, TransferEvent, TransferEventKind, Watcher,
};

pub const USDC_POLYGON: &str = "0x2791bca1f2de4661ed88a30c99a7a9449aa84174";

/// One USDC in smallest units
pub const ONE_USDC: u128 = 1_000_000;

/// Settings tuned for fast tests
pub fn test_settings() -> Settings {
	let mut settings = Settings::default();
	settings.logging = LoggingSettings {
		level: "debug".to_string(),
		format: LogFormat::Compact,
		structured: false,
	};
	settings.routing.adapter_timeout_ms = 200;
	settings.execution.confirmation_poll_ms = 10;
	settings.execution.confirmation_timeout_ms = 500;
	settings.watcher.backoff_schedule_ms = vec![5, 10, 20];
	settings.watcher.max_backoff_ms = 20;
	settings.watcher.max_consecutive_failures = 3;
	settings.watcher.request_timeout_ms = 200;
	settings.watcher.source_timeout_secs = 10;
	settings.watcher.relay_timeout_secs = 10;
	settings.watcher.destination_timeout_secs = 10;
	settings
}

pub struct TestEnv {
	pub mover: Mover,
	pub polygon: Chain,
	pub gnosis: Chain,
	pub usdc: Token,
	pub source: Arc<MockChainClient>,
	pub destination: Arc<MockChainClient>,
	pub signer: Arc<MockSigner>,
}

pub struct TestEnvBuilder {
	settings: Settings,
	source: MockChainClient,
	destination: MockChainClient,
	adapters: Vec<Arc<MockBridgeAdapter>>,
}

impl TestEnvBuilder {
	pub fn new() -> Self {
		Self {
			settings: test_settings(),
			source: MockChainClient::new(137).auto_include(true),
			destination: MockChainClient::new(100).auto_include(true),
			adapters: Vec::new(),
		}
	}

	pub fn settings(mut self, update: impl FnOnce(&mut Settings)) -> Self {
		update(&mut self.settings);
		self
	}

	pub fn source(mut self, client: MockChainClient) -> Self {
		self.source = client;
		self
	}

	pub fn destination(mut self, client: MockChainClient) -> Self {
		self.destination = client;
		self
	}

	pub fn adapter(mut self, adapter: Arc<MockBridgeAdapter>) -> Self {
		self.adapters.push(adapter);
		self
	}

	pub fn build(self) -> TestEnv {
		let polygon = Chain::polygon("http://polygon.test");
		let gnosis = Chain::gnosis("http://gnosis.test");
		let usdc = Token::new(USDC_POLYGON, polygon.clone());
		let source = Arc::new(self.source);
		let destination = Arc::new(self.destination);
		let signer = Arc::new(MockSigner::default());

		let mut builder = MoverBuilder::new()
			.with_settings(self.settings)
			.with_chain(polygon.clone(), source.clone())
			.with_chain(gnosis.clone(), destination.clone())
			.with_signer(signer.clone());
		for adapter in self.adapters {
			builder = builder.with_adapter(adapter);
		}
		let mover = builder.build().expect("test mover should build");

		TestEnv {
			mover,
			polygon,
			gnosis,
			usdc,
			source,
			destination,
			signer,
		}
	}
}

/// Events received by a watcher, in delivery order
#[derive(Clone, Default)]
pub struct EventLog {
	events: Arc<Mutex<Vec<TransferEvent>>>,
}

impl EventLog {
	/// Record every event kind emitted by `watcher`
	pub fn attach(watcher: &Watcher) -> Self {
		let log = Self::default();
		for kind in TransferEventKind::ALL {
			let events = log.events.clone();
			watcher.on(kind, move |event| {
				let events = events.clone();
				async move {
					events.lock().unwrap().push(event);
					Ok::<(), HandlerError>(())
				}
			});
		}
		log
	}

	pub fn events(&self) -> Vec<TransferEvent> {
		self.events.lock().unwrap().clone()
	}

	pub fn len(&self) -> usize {
		self.events.lock().unwrap().len()
	}

	pub fn kinds(&self) -> Vec<TransferEventKind> {
		self.events().into_iter().map(|e| e.kind).collect()
	}

	/// Wait until at least `count` events were delivered
	pub async fn wait_for(&self, count: usize) -> Vec<TransferEventKind> {
		let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
		while self.len() < count {
			if tokio::time::Instant::now() > deadline {
				panic!("expected {} events, got {:?}", count, self.kinds());
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
		self.kinds()
	}
}
