//! Transfer handle, lifecycle phases and failure causes

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod events;

pub use errors::{HandlerError, TransferError, WatchError};
pub use events::{TransferEvent, TransferEventKind};

use crate::models::{Chain, Token, TxRef};
use crate::routes::CompletionProtocol;

/// Result types for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;
pub type WatchResult<T> = Result<T, WatchError>;

/// Caller-owned reference to a transfer whose source transaction was submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferHandle {
	pub source_tx: TxRef,
	pub source_chain: Chain,
	pub destination_chain: Chain,
	pub token: Token,
	pub bridge_name: String,
	pub completion_protocol: CompletionProtocol,
}

impl TransferHandle {
	/// Whether a destination claim must be submitted to finish this transfer
	pub fn requires_claim(&self) -> bool {
		self.completion_protocol.requires_claim()
	}

	/// Ledger key: the source transaction is unique per source chain
	pub fn key(&self) -> TransferKey {
		TransferKey::new(self.source_chain.chain_id, &self.source_tx)
	}
}

/// Identity of a transfer across the executor and watchers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferKey {
	pub source_chain_id: u64,
	pub source_tx: TxRef,
}

impl TransferKey {
	pub fn new(source_chain_id: u64, source_tx: &TxRef) -> Self {
		Self {
			source_chain_id,
			source_tx: source_tx.clone(),
		}
	}
}

impl std::fmt::Display for TransferKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.source_chain_id, self.source_tx)
	}
}

/// Lifecycle phase of a watched transfer
///
/// Phases only ever move forward; `Failed` is reachable from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
	Started,
	SourceTxPending,
	SourceTxConfirmed,
	ClaimPending,
	ClaimConfirmed,
	DestinationTxPending,
	DestinationTxConfirmed,
	Failed,
}

impl TransferPhase {
	/// Position in the lifecycle, used to enforce forward-only transitions
	pub fn rank(&self) -> u8 {
		match self {
			TransferPhase::Started => 0,
			TransferPhase::SourceTxPending => 1,
			TransferPhase::SourceTxConfirmed => 2,
			TransferPhase::ClaimPending => 3,
			TransferPhase::ClaimConfirmed => 4,
			TransferPhase::DestinationTxPending => 5,
			TransferPhase::DestinationTxConfirmed => 6,
			TransferPhase::Failed => 7,
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			TransferPhase::DestinationTxConfirmed | TransferPhase::Failed
		)
	}

	/// Whether moving from `self` to `next` is a legal transition
	pub fn can_advance_to(&self, next: TransferPhase) -> bool {
		if self.is_terminal() {
			return false;
		}
		next == TransferPhase::Failed || next.rank() > self.rank()
	}
}

impl std::fmt::Display for TransferPhase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			TransferPhase::Started => "started",
			TransferPhase::SourceTxPending => "source_tx_pending",
			TransferPhase::SourceTxConfirmed => "source_tx_confirmed",
			TransferPhase::ClaimPending => "claim_pending",
			TransferPhase::ClaimConfirmed => "claim_confirmed",
			TransferPhase::DestinationTxPending => "destination_tx_pending",
			TransferPhase::DestinationTxConfirmed => "destination_tx_confirmed",
			TransferPhase::Failed => "failed",
		};
		f.write_str(name)
	}
}

/// Which transaction of a transfer a failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferLeg {
	Source,
	Claim,
	Destination,
}

/// Why a watch session ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum FailureCause {
	TransactionReverted { leg: TransferLeg, tx_ref: TxRef },
	PollingTimeout { phase: TransferPhase, detail: String },
	RelayFailed { reason: String },
}

impl std::fmt::Display for FailureCause {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FailureCause::TransactionReverted { leg, tx_ref } => {
				write!(f, "{:?} transaction {} reverted", leg, tx_ref)
			},
			FailureCause::PollingTimeout { phase, detail } => {
				write!(f, "polling timed out in {}: {}", phase, detail)
			},
			FailureCause::RelayFailed { reason } => write!(f, "relay failed: {}", reason),
		}
	}
}
