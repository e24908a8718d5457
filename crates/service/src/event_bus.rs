//! Per-session delivery of transfer lifecycle events
//!
//! Handlers are registered per event kind and run sequentially in
//! registration order. A failing or panicking handler is reported on the
//! diagnostics channel and never stops delivery to the others.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures::FutureExt;
use movr_types::{HandlerError, TransferEvent, TransferEventKind};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

const TRACING_TARGET: &str = "movr::event_bus";

/// Receives lifecycle events of one watch session
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventHandler: Send + Sync {
	async fn handle(&self, event: &TransferEvent) -> Result<(), HandlerError>;
}

/// Adapts an async closure into an [`EventHandler`]
pub struct FnHandler<F> {
	f: F,
}

impl<F> FnHandler<F> {
	pub fn new(f: F) -> Self {
		Self { f }
	}
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
	F: Fn(TransferEvent) -> Fut + Send + Sync,
	Fut: Future<Output = Result<(), HandlerError>> + Send,
{
	async fn handle(&self, event: &TransferEvent) -> Result<(), HandlerError> {
		(self.f)(event.clone()).await
	}
}

/// A handler failure reported on the diagnostics channel
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerDiagnostic {
	pub session_id: String,
	pub kind: TransferEventKind,
	pub sequence: u64,
	pub error: HandlerError,
}

type HandlerMap = HashMap<TransferEventKind, Vec<Arc<dyn EventHandler>>>;

/// Handler registry and dispatcher for one watch session
pub struct EventBus {
	session_id: String,
	handlers: RwLock<HandlerMap>,
	cancelled: AtomicBool,
	diagnostics: mpsc::UnboundedSender<HandlerDiagnostic>,
}

impl std::fmt::Debug for EventBus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EventBus")
			.field("session_id", &self.session_id)
			.field("cancelled", &self.is_cancelled())
			.finish_non_exhaustive()
	}
}

impl EventBus {
	/// Create a bus and the receiving end of its diagnostics channel
	pub fn new(
		session_id: impl Into<String>,
	) -> (Self, mpsc::UnboundedReceiver<HandlerDiagnostic>) {
		let (diagnostics, receiver) = mpsc::unbounded_channel();
		let bus = Self {
			session_id: session_id.into(),
			handlers: RwLock::new(HashMap::new()),
			cancelled: AtomicBool::new(false),
			diagnostics,
		};
		(bus, receiver)
	}

	pub fn subscribe(&self, kind: TransferEventKind, handler: Arc<dyn EventHandler>) {
		let mut handlers = self
			.handlers
			.write()
			.unwrap_or_else(PoisonError::into_inner);
		handlers.entry(kind).or_default().push(handler);
	}

	/// Stop all further delivery, including to the remaining handlers of an event in flight
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	/// Deliver `event` to its handlers, returning how many succeeded
	pub async fn publish(&self, event: &TransferEvent) -> usize {
		let handlers: Vec<Arc<dyn EventHandler>> = self
			.handlers
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(&event.kind)
			.cloned()
			.unwrap_or_default();

		debug!(
			target: TRACING_TARGET,
			session_id = %self.session_id,
			kind = %event.kind,
			sequence = event.sequence,
			handlers = handlers.len(),
			"Publishing event"
		);

		let mut delivered = 0;
		for handler in handlers {
			if self.is_cancelled() {
				break;
			}

			let result = match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
				Ok(result) => result,
				Err(_) => {
					error!(
						target: TRACING_TARGET,
						session_id = %self.session_id,
						kind = %event.kind,
						"Event handler panicked"
					);
					Err(HandlerError::new("handler panicked"))
				},
			};

			match result {
				Ok(()) => delivered += 1,
				Err(error) => {
					warn!(
						target: TRACING_TARGET,
						session_id = %self.session_id,
						kind = %event.kind,
						error = %error,
						"Event handler failed"
					);
					// The receiver may have been dropped; failures are still logged
					let _ = self.diagnostics.send(HandlerDiagnostic {
						session_id: self.session_id.clone(),
						kind: event.kind,
						sequence: event.sequence,
						error,
					});
				},
			}
		}

		delivered
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use movr_types::{TransferPhase, TxRef};
	use std::sync::Mutex;

	fn event(kind: TransferEventKind) -> TransferEvent {
		TransferEvent {
			sequence: 1,
			session_id: "session-1".to_string(),
			kind,
			phase: TransferPhase::SourceTxPending,
			source_tx: TxRef::new("0x5e"),
			source_chain_id: 137,
			destination_chain_id: 100,
			bridge_name: "hop".to_string(),
			tx_ref: None,
			confirmations: None,
			cause: None,
			emitted_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn test_delivers_only_to_matching_kind() {
		let (bus, _diagnostics) = EventBus::new("session-1");

		let mut started = MockEventHandler::new();
		started.expect_handle().times(1).returning(|_| Ok(()));
		let mut failed = MockEventHandler::new();
		failed.expect_handle().times(0);

		bus.subscribe(TransferEventKind::SourceTxStarted, Arc::new(started));
		bus.subscribe(TransferEventKind::TransferFailed, Arc::new(failed));

		assert_eq!(bus.publish(&event(TransferEventKind::SourceTxStarted)).await, 1);
	}

	#[tokio::test]
	async fn test_failing_handler_is_isolated_and_reported() {
		let (bus, mut diagnostics) = EventBus::new("session-1");

		let mut failing = MockEventHandler::new();
		failing
			.expect_handle()
			.returning(|_| Err(HandlerError::new("db unavailable")));
		let mut healthy = MockEventHandler::new();
		healthy.expect_handle().times(1).returning(|_| Ok(()));

		bus.subscribe(TransferEventKind::SourceTxCompleted, Arc::new(failing));
		bus.subscribe(TransferEventKind::SourceTxCompleted, Arc::new(healthy));

		assert_eq!(bus.publish(&event(TransferEventKind::SourceTxCompleted)).await, 1);

		let diagnostic = diagnostics.try_recv().unwrap();
		assert_eq!(diagnostic.kind, TransferEventKind::SourceTxCompleted);
		assert_eq!(diagnostic.error, HandlerError::new("db unavailable"));
	}

	#[tokio::test]
	async fn test_panicking_handler_is_isolated() {
		let (bus, mut diagnostics) = EventBus::new("session-1");
		let seen = Arc::new(Mutex::new(Vec::new()));

		bus.subscribe(
			TransferEventKind::ClaimToBeStarted,
			Arc::new(FnHandler::new(|_event: TransferEvent| async move {
				if true {
					panic!("handler bug");
				}
				Ok::<(), HandlerError>(())
			})),
		);
		let seen_clone = seen.clone();
		bus.subscribe(
			TransferEventKind::ClaimToBeStarted,
			Arc::new(FnHandler::new(move |event: TransferEvent| {
				let seen = seen_clone.clone();
				async move {
					seen.lock().unwrap().push(event.kind);
					Ok::<(), HandlerError>(())
				}
			})),
		);

		assert_eq!(bus.publish(&event(TransferEventKind::ClaimToBeStarted)).await, 1);
		assert_eq!(*seen.lock().unwrap(), vec![TransferEventKind::ClaimToBeStarted]);
		assert_eq!(
			diagnostics.try_recv().unwrap().error,
			HandlerError::new("handler panicked")
		);
	}

	#[tokio::test]
	async fn test_cancelled_bus_delivers_nothing() {
		let (bus, _diagnostics) = EventBus::new("session-1");
		let mut handler = MockEventHandler::new();
		handler.expect_handle().times(0);
		bus.subscribe(TransferEventKind::SourceTxStarted, Arc::new(handler));

		bus.cancel();
		assert!(bus.is_cancelled());
		assert_eq!(bus.publish(&event(TransferEventKind::SourceTxStarted)).await, 0);
	}
}
