//! Movr Adapters
//!
//! Registries for bridge adapters and chain clients, and a JSON-RPC client
//! for EVM-compatible chains.

pub mod adapter_registry;
pub mod chain_registry;
pub mod rpc_client;

pub use adapter_registry::AdapterRegistry;
pub use chain_registry::{ChainRegistry, ChainRegistryError, RegisteredChain};
pub use rpc_client::JsonRpcChainClient;
pub use movr_types::{AdapterError, AdapterRegistryError, AdapterResult, BridgeAdapter};
