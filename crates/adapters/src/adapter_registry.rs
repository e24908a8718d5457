//! Registry of bridge adapters keyed by bridge name

use std::collections::HashMap;
use std::sync::Arc;

use movr_types::{AdapterRegistryError, BridgeAdapter};
use tracing::debug;

/// Bridge adapters available to the route engine, executor and watchers
#[derive(Debug, Default, Clone)]
pub struct AdapterRegistry {
	adapters: HashMap<String, Arc<dyn BridgeAdapter>>,
}

impl AdapterRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register an adapter under its bridge name
	///
	/// Names are unique; registering a second adapter under the same name fails.
	pub fn register(&mut self, adapter: Arc<dyn BridgeAdapter>) -> Result<(), AdapterRegistryError> {
		let bridge_name = adapter.bridge_name().to_string();
		if bridge_name.trim().is_empty() || bridge_name.chars().any(char::is_whitespace) {
			return Err(AdapterRegistryError::InvalidBridgeName { bridge_name });
		}
		if self.adapters.contains_key(&bridge_name) {
			return Err(AdapterRegistryError::AlreadyRegistered { bridge_name });
		}
		debug!(bridge = %bridge_name, "Registered bridge adapter");
		self.adapters.insert(bridge_name, adapter);
		Ok(())
	}

	pub fn get(&self, bridge_name: &str) -> Option<Arc<dyn BridgeAdapter>> {
		self.adapters.get(bridge_name).cloned()
	}

	/// All adapters ordered by bridge name
	pub fn all(&self) -> Vec<Arc<dyn BridgeAdapter>> {
		let mut adapters: Vec<_> = self.adapters.values().cloned().collect();
		adapters.sort_by(|a, b| a.bridge_name().cmp(b.bridge_name()));
		adapters
	}

	pub fn bridge_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.adapters.keys().cloned().collect();
		names.sort();
		names
	}

	pub fn len(&self) -> usize {
		self.adapters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.adapters.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use movr_types::{
		AdapterResult, Amount, BridgeQuote, Chain, CompletionProtocol, RelayStatus, RouteQuote,
		Token, TxRef, UnsignedTransaction,
	};

	#[derive(Debug)]
	struct NamedAdapter(&'static str);

	#[async_trait]
	impl BridgeAdapter for NamedAdapter {
		fn bridge_name(&self) -> &str {
			self.0
		}

		fn completion_protocol(&self, _: &Chain, _: &Chain) -> CompletionProtocol {
			CompletionProtocol::OneStep
		}

		async fn quote(&self, _: &Token, _: &Chain, _: &Chain, amount: Amount) -> AdapterResult<BridgeQuote> {
			Ok(BridgeQuote::new(amount, Amount::ZERO, 60))
		}

		async fn build_approval(&self, _: &RouteQuote, _: &str) -> AdapterResult<Option<UnsignedTransaction>> {
			Ok(None)
		}

		async fn build_send(&self, _: &RouteQuote, _: &str) -> AdapterResult<UnsignedTransaction> {
			unimplemented!()
		}

		async fn relay_status(&self, _: &TxRef, _: &Chain, _: &Chain) -> AdapterResult<RelayStatus> {
			Ok(RelayStatus::Pending)
		}
	}

	#[test]
	fn test_register_and_lookup() {
		let mut registry = AdapterRegistry::new();
		registry.register(Arc::new(NamedAdapter("hop"))).unwrap();
		registry.register(Arc::new(NamedAdapter("connext"))).unwrap();

		assert_eq!(registry.len(), 2);
		assert!(registry.get("hop").is_some());
		assert!(registry.get("across").is_none());
		assert_eq!(registry.bridge_names(), vec!["connext", "hop"]);
		assert_eq!(registry.all()[0].bridge_name(), "connext");
	}

	#[test]
	fn test_duplicate_and_invalid_names_rejected() {
		let mut registry = AdapterRegistry::new();
		registry.register(Arc::new(NamedAdapter("hop"))).unwrap();

		assert_eq!(
			registry.register(Arc::new(NamedAdapter("hop"))),
			Err(AdapterRegistryError::AlreadyRegistered {
				bridge_name: "hop".to_string()
			})
		);
		assert!(matches!(
			registry.register(Arc::new(NamedAdapter("my bridge"))),
			Err(AdapterRegistryError::InvalidBridgeName { .. })
		));
		assert!(matches!(
			registry.register(Arc::new(NamedAdapter(""))),
			Err(AdapterRegistryError::InvalidBridgeName { .. })
		));
	}
}
