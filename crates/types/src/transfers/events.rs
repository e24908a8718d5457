//! Lifecycle events emitted by transfer watchers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FailureCause, TransferPhase};
use crate::models::TxRef;

/// Kinds of lifecycle events a caller can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferEventKind {
	SourceTxStarted,
	SourceTxCompleted,
	ClaimToBeStarted,
	ClaimCompleted,
	DestinationTxStarted,
	DestinationTxCompleted,
	TransferFailed,
}

impl TransferEventKind {
	pub const ALL: [TransferEventKind; 7] = [
		TransferEventKind::SourceTxStarted,
		TransferEventKind::SourceTxCompleted,
		TransferEventKind::ClaimToBeStarted,
		TransferEventKind::ClaimCompleted,
		TransferEventKind::DestinationTxStarted,
		TransferEventKind::DestinationTxCompleted,
		TransferEventKind::TransferFailed,
	];

	/// Event emitted on entering `phase`
	pub fn for_phase(phase: TransferPhase) -> Option<Self> {
		match phase {
			TransferPhase::Started => None,
			TransferPhase::SourceTxPending => Some(TransferEventKind::SourceTxStarted),
			TransferPhase::SourceTxConfirmed => Some(TransferEventKind::SourceTxCompleted),
			TransferPhase::ClaimPending => Some(TransferEventKind::ClaimToBeStarted),
			TransferPhase::ClaimConfirmed => Some(TransferEventKind::ClaimCompleted),
			TransferPhase::DestinationTxPending => Some(TransferEventKind::DestinationTxStarted),
			TransferPhase::DestinationTxConfirmed => {
				Some(TransferEventKind::DestinationTxCompleted)
			},
			TransferPhase::Failed => Some(TransferEventKind::TransferFailed),
		}
	}
}

impl std::fmt::Display for TransferEventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(self, f)
	}
}

/// One lifecycle event, delivered in transition order within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEvent {
	/// Position in the session's event stream, starting at 1
	pub sequence: u64,
	pub session_id: String,
	pub kind: TransferEventKind,
	pub phase: TransferPhase,
	pub source_tx: TxRef,
	pub source_chain_id: u64,
	pub destination_chain_id: u64,
	pub bridge_name: String,
	/// Claim or destination transaction relevant to this event
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tx_ref: Option<TxRef>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confirmations: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cause: Option<FailureCause>,
	pub emitted_at: DateTime<Utc>,
}
