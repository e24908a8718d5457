//! Error types for transfer execution and watching

use thiserror::Error;

use super::TransferKey;
use crate::adapters::AdapterError;
use crate::chains::{ChainError, SignerError};
use crate::models::{TransactionKind, TxRef};

/// Errors surfaced by `send` and `claim`
///
/// Execution failures are never retried automatically: resubmitting an
/// approval or send must be an explicit caller decision.
#[derive(Error, Debug)]
pub enum TransferError {
	#[error("Signing rejected for chain {chain_id}: {reason}")]
	SigningRejected { chain_id: u64, reason: String },

	#[error("{kind} transaction {tx_ref} reverted on chain {chain_id}")]
	TransactionReverted {
		chain_id: u64,
		kind: TransactionKind,
		tx_ref: TxRef,
	},

	#[error("Claim not required: bridge {bridge_name} completes {source_tx} in one step")]
	ClaimNotRequired { source_tx: TxRef, bridge_name: String },

	#[error("Claim already submitted for {source_tx}")]
	ClaimAlreadySubmitted {
		source_tx: TxRef,
		claim_tx: Option<TxRef>,
	},

	#[error("Transaction {tx_ref} not confirmed on chain {chain_id} within {timeout_ms}ms")]
	ConfirmationTimeout {
		chain_id: u64,
		tx_ref: TxRef,
		timeout_ms: u64,
	},

	#[error("Quote {route_id} has expired")]
	QuoteExpired { route_id: String },

	#[error("Route {route_id} does not match the transfer: {reason}")]
	RouteMismatch { route_id: String, reason: String },

	#[error("Unknown transfer: {key}")]
	UnknownTransfer { key: TransferKey },

	#[error("No adapter registered for bridge {bridge_name}")]
	UnknownBridge { bridge_name: String },

	#[error("No client registered for chain {chain_id}")]
	UnknownChain { chain_id: u64 },

	#[error("Adapter error: {0}")]
	Adapter(#[from] AdapterError),

	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),
}

impl From<SignerError> for TransferError {
	fn from(error: SignerError) -> Self {
		match error {
			SignerError::SigningRejected { chain_id, reason } => {
				TransferError::SigningRejected { chain_id, reason }
			},
			SignerError::UnsupportedChain { chain_id } => TransferError::SigningRejected {
				chain_id,
				reason: "signer does not support this chain".to_string(),
			},
		}
	}
}

/// Errors creating or controlling a watch session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WatchError {
	#[error("No adapter registered for bridge {bridge_name}")]
	UnknownBridge { bridge_name: String },

	#[error("No client registered for chain {chain_id}")]
	UnknownChain { chain_id: u64 },

	#[error("Source and destination chain are the same: {chain_id}")]
	SameChain { chain_id: u64 },

	#[error("Watch session {session_id} already started")]
	AlreadyStarted { session_id: String },
}

/// Failure of a caller-supplied lifecycle event handler
///
/// Isolated per handler: it is reported on the session's diagnostics channel
/// and never aborts the watcher or other handlers.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Event handler failed: {message}")]
pub struct HandlerError {
	pub message: String,
}

impl HandlerError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

impl From<String> for HandlerError {
	fn from(message: String) -> Self {
		Self { message }
	}
}

impl From<&str> for HandlerError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}

impl From<TransferError> for HandlerError {
	fn from(error: TransferError) -> Self {
		Self::new(error.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_signer_error_maps_to_signing_rejected() {
		let error: TransferError = SignerError::SigningRejected {
			chain_id: 137,
			reason: "declined".to_string(),
		}
		.into();
		assert!(matches!(
			error,
			TransferError::SigningRejected { chain_id: 137, .. }
		));
	}

	#[test]
	fn test_transfer_error_messages() {
		let error = TransferError::TransactionReverted {
			chain_id: 137,
			kind: TransactionKind::Approval,
			tx_ref: TxRef::new("0xabc"),
		};
		assert_eq!(
			error.to_string(),
			"approval transaction 0xabc reverted on chain 137"
		);

		let handler_error: HandlerError = TransferError::ClaimNotRequired {
			source_tx: TxRef::new("0x1"),
			bridge_name: "connext".to_string(),
		}
		.into();
		assert!(handler_error.message.contains("Claim not required"));
	}
}
