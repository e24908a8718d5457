//! Movr Types
//!
//! Shared models and capability traits for cross-chain transfer orchestration.
//! This crate contains all domain models organized by concern.

pub mod adapters;
pub mod chains;
pub mod models;
pub mod routes;
pub mod transfers;

// Re-export chrono and serde_json for convenience
pub use chrono;
pub use serde_json;

// Re-export commonly used types for convenience
pub use models::{
	Amount, Chain, SignedTransaction, Token, TransactionKind, TxReceipt, TxRef,
	UnsignedTransaction,
};

pub use adapters::{
	AdapterError, AdapterRegistryError, AdapterResult, BridgeAdapter, BridgeQuote, RelayStatus,
};

pub use chains::{ChainClient, ChainError, ChainResult, Signer, SignerError};

pub use routes::{
	CompletionProtocol, RouteError, RouteQuote, RouteRequest, RouteResult, RouteSelectionPolicy,
	RouteValidationError,
};

pub use transfers::{
	FailureCause, HandlerError, TransferError, TransferEvent, TransferEventKind, TransferHandle,
	TransferKey, TransferLeg, TransferPhase, TransferResult, WatchError, WatchResult,
};
