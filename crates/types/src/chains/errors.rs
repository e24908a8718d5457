//! Error types for chain client and signer operations

use thiserror::Error;

/// Chain connectivity errors
#[derive(Error, Debug)]
pub enum ChainError {
	#[error("HTTP request failed: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("RPC error {code} from chain {chain_id}: {message}")]
	Rpc {
		chain_id: u64,
		code: i64,
		message: String,
	},

	#[error("Invalid response from chain {chain_id}: {reason}")]
	InvalidResponse { chain_id: u64, reason: String },

	#[error("Transaction rejected by chain {chain_id}: {reason}")]
	SubmissionRejected { chain_id: u64, reason: String },

	#[error("Timeout occurred after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("Connection error: {0}")]
	Connection(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Signing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignerError {
	#[error("Signing rejected for chain {chain_id}: {reason}")]
	SigningRejected { chain_id: u64, reason: String },

	#[error("Signer does not support chain {chain_id}")]
	UnsupportedChain { chain_id: u64 },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_messages() {
		let error = ChainError::Rpc {
			chain_id: 137,
			code: -32000,
			message: "nonce too low".to_string(),
		};
		assert!(error.to_string().contains("-32000"));
		assert!(error.to_string().contains("nonce too low"));

		let error = SignerError::SigningRejected {
			chain_id: 100,
			reason: "user declined".to_string(),
		};
		assert_eq!(
			error.to_string(),
			"Signing rejected for chain 100: user declined"
		);
	}
}
