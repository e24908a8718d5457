//! Blockchain identity model

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A blockchain the mover can send from or to
///
/// Identity is the chain id alone: two `Chain` values with the same id but
/// different endpoints compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
	/// Chain ID (e.g., 1 for Ethereum mainnet, 137 for Polygon, 100 for Gnosis)
	pub chain_id: u64,
	/// RPC connection descriptor for this chain
	pub endpoint: String,
	/// Human-readable name (e.g., "Polygon")
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl Chain {
	pub fn new(chain_id: u64, endpoint: impl Into<String>) -> Self {
		Self {
			chain_id,
			endpoint: endpoint.into(),
			name: None,
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Name if configured, otherwise `chain-<id>`
	pub fn display_name(&self) -> String {
		self.name
			.clone()
			.unwrap_or_else(|| format!("chain-{}", self.chain_id))
	}
}

impl PartialEq for Chain {
	fn eq(&self, other: &Self) -> bool {
		self.chain_id == other.chain_id
	}
}

impl Eq for Chain {}

impl Hash for Chain {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.chain_id.hash(state);
	}
}

impl std::fmt::Display for Chain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.name {
			Some(name) => write!(f, "{} ({})", name, self.chain_id),
			None => write!(f, "chain {}", self.chain_id),
		}
	}
}

/// Common chain constants
impl Chain {
	/// Polygon PoS mainnet
	pub fn polygon(endpoint: impl Into<String>) -> Self {
		Self::new(137, endpoint).with_name("Polygon")
	}

	/// Gnosis chain (formerly xDai)
	pub fn gnosis(endpoint: impl Into<String>) -> Self {
		Self::new(100, endpoint).with_name("Gnosis")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn test_identity_is_chain_id() {
		let a = Chain::new(137, "https://polygon-rpc.com");
		let b = Chain::new(137, "https://other-node.example");
		assert_eq!(a, b);

		let mut set = HashSet::new();
		set.insert(a);
		assert!(set.contains(&b));
		assert_ne!(b, Chain::new(100, "https://rpc.gnosischain.com"));
	}

	#[test]
	fn test_display_name() {
		assert_eq!(Chain::new(10, "x").display_name(), "chain-10");
		assert_eq!(Chain::polygon("x").display_name(), "Polygon");
	}
}
