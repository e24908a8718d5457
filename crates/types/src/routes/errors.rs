//! Error types for route estimation

use thiserror::Error;

/// Validation errors for route requests
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteValidationError {
	#[error("Invalid amount: must be greater than zero")]
	ZeroAmount,

	#[error("Source and destination chain are the same: {chain_id}")]
	SameChain { chain_id: u64 },

	#[error("Token {token} does not belong to source chain {chain_id}")]
	TokenChainMismatch { token: String, chain_id: u64 },
}

/// Route estimation errors
#[derive(Error, Debug)]
pub enum RouteError {
	#[error("Route validation failed: {0}")]
	Validation(#[from] RouteValidationError),

	#[error("No route available from chain {source_chain_id} to chain {destination_chain_id}")]
	NoRouteAvailable {
		source_chain_id: u64,
		destination_chain_id: u64,
	},
}
