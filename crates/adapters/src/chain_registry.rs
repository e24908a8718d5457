//! Registry of chains and the clients used to reach them

use std::collections::HashMap;
use std::sync::Arc;

use movr_types::{Chain, ChainClient};
use thiserror::Error;
use tracing::debug;

/// Chain registration errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChainRegistryError {
	#[error("Chain {chain_id} already registered")]
	AlreadyRegistered { chain_id: u64 },

	#[error("Client for chain {actual} registered as chain {expected}")]
	ChainIdMismatch { expected: u64, actual: u64 },
}

/// A chain together with its client
#[derive(Clone)]
pub struct RegisteredChain {
	pub chain: Chain,
	pub client: Arc<dyn ChainClient>,
}

impl std::fmt::Debug for RegisteredChain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RegisteredChain")
			.field("chain", &self.chain)
			.finish_non_exhaustive()
	}
}

/// Chains known to the mover, keyed by chain id
#[derive(Debug, Default, Clone)]
pub struct ChainRegistry {
	chains: HashMap<u64, RegisteredChain>,
}

impl ChainRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(
		&mut self,
		chain: Chain,
		client: Arc<dyn ChainClient>,
	) -> Result<(), ChainRegistryError> {
		if client.chain_id() != chain.chain_id {
			return Err(ChainRegistryError::ChainIdMismatch {
				expected: chain.chain_id,
				actual: client.chain_id(),
			});
		}
		if self.chains.contains_key(&chain.chain_id) {
			return Err(ChainRegistryError::AlreadyRegistered {
				chain_id: chain.chain_id,
			});
		}
		debug!(chain_id = chain.chain_id, chain = %chain.display_name(), "Registered chain");
		self.chains
			.insert(chain.chain_id, RegisteredChain { chain, client });
		Ok(())
	}

	pub fn get(&self, chain_id: u64) -> Option<&RegisteredChain> {
		self.chains.get(&chain_id)
	}

	pub fn client(&self, chain_id: u64) -> Option<Arc<dyn ChainClient>> {
		self.chains.get(&chain_id).map(|entry| entry.client.clone())
	}

	pub fn contains(&self, chain_id: u64) -> bool {
		self.chains.contains_key(&chain_id)
	}

	/// Registered chains ordered by chain id
	pub fn chains(&self) -> Vec<Chain> {
		let mut chains: Vec<Chain> = self.chains.values().map(|c| c.chain.clone()).collect();
		chains.sort_by_key(|c| c.chain_id);
		chains
	}

	pub fn len(&self) -> usize {
		self.chains.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chains.is_empty()
	}
}
