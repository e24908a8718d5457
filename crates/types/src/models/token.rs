//! Token model bound to its owning chain

use serde::{Deserialize, Serialize};

use super::Chain;

/// A token contract on a specific chain
///
/// A token is meaningless without its chain: the same address on two chains
/// yields two distinct tokens. Addresses are stored lower-cased so that
/// checksummed and plain hex spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
	/// Contract address (zero address for the chain's native asset)
	pub address: String,
	/// Chain that owns this token
	pub chain: Chain,
}

pub const NATIVE_TOKEN_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

impl Token {
	pub fn new(address: impl AsRef<str>, chain: Chain) -> Self {
		Self {
			address: address.as_ref().trim().to_lowercase(),
			chain,
		}
	}

	/// The chain's native asset
	pub fn native(chain: Chain) -> Self {
		Self::new(NATIVE_TOKEN_ADDRESS, chain)
	}

	pub fn is_native(&self) -> bool {
		self.address == NATIVE_TOKEN_ADDRESS
	}

	/// Whether this token lives on `chain`
	pub fn belongs_to(&self, chain: &Chain) -> bool {
		self.chain == *chain
	}

	pub fn chain_id(&self) -> u64 {
		self.chain.chain_id
	}
}

impl std::fmt::Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}@{}", self.address, self.chain.chain_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const USDC_POLYGON: &str = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174";

	#[test]
	fn test_address_is_normalized() {
		let polygon = Chain::polygon("https://polygon-rpc.com");
		let checksummed = Token::new(USDC_POLYGON, polygon.clone());
		let lower = Token::new(USDC_POLYGON.to_lowercase(), polygon);
		assert_eq!(checksummed, lower);
	}

	#[test]
	fn test_same_address_on_other_chain_is_distinct() {
		let on_polygon = Token::new(USDC_POLYGON, Chain::polygon("a"));
		let on_gnosis = Token::new(USDC_POLYGON, Chain::gnosis("b"));
		assert_ne!(on_polygon, on_gnosis);
		assert!(on_polygon.belongs_to(&Chain::new(137, "c")));
		assert!(!on_polygon.belongs_to(&Chain::new(100, "c")));
	}

	#[test]
	fn test_native_token() {
		let eth = Token::native(Chain::new(1, "x"));
		assert!(eth.is_native());
		assert!(!Token::new(USDC_POLYGON, Chain::new(1, "x")).is_native());
	}
}
