//! Movr Service
//!
//! Route estimation, transfer execution and transfer watching.

pub mod event_bus;
pub mod executor;
pub mod ledger;
pub mod route_engine;
pub mod watcher;

pub use event_bus::{EventBus, EventHandler, FnHandler, HandlerDiagnostic};
pub use executor::{ExecutorConfig, TransferExecutor};
pub use ledger::{ClaimEntry, ClaimReservation, TransferLedger};
pub use route_engine::{RouteEngine, RouteEngineConfig};
pub use watcher::{
	Observation, ObserverKind, PollingConfig, TransferState, TransferWatcher, TxStatus, Watcher,
};
