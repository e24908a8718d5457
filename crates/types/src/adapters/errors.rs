//! Error types for bridge adapter operations

use thiserror::Error;

/// Bridge adapter operation errors
#[derive(Error, Debug)]
pub enum AdapterError {
	#[error("Adapter not found: {bridge_name}")]
	NotFound { bridge_name: String },

	#[error("HTTP request failed: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("Timeout occurred after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("Invalid response format: {reason}")]
	InvalidResponse { reason: String },

	#[error("HTTP {status_code}: {reason}")]
	HttpStatusError { status_code: u16, reason: String },

	#[error("Quote failed for bridge {bridge_name}: {reason}")]
	QuoteFailed { bridge_name: String, reason: String },

	#[error("Route from chain {source_chain_id} to chain {destination_chain_id} not supported by {bridge_name}")]
	UnsupportedRoute {
		bridge_name: String,
		source_chain_id: u64,
		destination_chain_id: u64,
	},

	#[error("Unsupported operation: {operation} for bridge {bridge_name}")]
	UnsupportedOperation {
		operation: String,
		bridge_name: String,
	},

	#[error("Insufficient liquidity on {bridge_name}")]
	InsufficientLiquidity { bridge_name: String },

	#[error("Relay status unavailable: {reason}")]
	RelayUnavailable { reason: String },

	#[error("Network error: {0}")]
	Network(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl AdapterError {
	/// Whether this error is the per-adapter timeout
	pub fn is_timeout(&self) -> bool {
		matches!(self, AdapterError::Timeout { .. })
	}

	/// Extract HTTP status code from the error if available
	pub fn status_code(&self) -> Option<u16> {
		match self {
			AdapterError::HttpStatusError { status_code, .. } => Some(*status_code),
			AdapterError::HttpError(reqwest_error) => {
				reqwest_error.status().map(|status| status.as_u16())
			},
			_ => None,
		}
	}
}

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterRegistryError {
	#[error("Adapter already registered: {bridge_name}")]
	AlreadyRegistered { bridge_name: String },

	#[error("Invalid bridge name: '{bridge_name}'")]
	InvalidBridgeName { bridge_name: String },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_adapter_error_status_code_extraction() {
		let error = AdapterError::HttpStatusError {
			status_code: 503,
			reason: "Service Unavailable".to_string(),
		};
		assert_eq!(error.status_code(), Some(503));

		let error = AdapterError::Timeout { timeout_ms: 1500 };
		assert_eq!(error.status_code(), None);
		assert!(error.is_timeout());
		assert!(error.to_string().contains("1500ms"));
	}
}
