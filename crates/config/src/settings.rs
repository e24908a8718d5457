//! Configuration settings structures

use crate::configurable_value::{ConfigurableValue, ConfigurableValueError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
	pub logging: LoggingSettings,
	pub chains: HashMap<String, ChainSettings>,
	pub routing: RoutingSettings,
	pub execution: ExecutionSettings,
	pub watcher: WatcherSettings,
}

/// Individual chain configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainSettings {
	pub chain_id: u64,
	pub name: Option<String>,
	/// RPC endpoint, usually `{"type": "env", "value": "POLYGON_RPC_NODE"}`
	pub rpc_endpoint: ConfigurableValue,
	#[serde(default = "default_true")]
	pub enabled: bool,
	/// Timeout for individual RPC requests
	#[serde(default = "default_rpc_timeout_ms")]
	pub request_timeout_ms: u64,
}

fn default_true() -> bool {
	true
}

fn default_rpc_timeout_ms() -> u64 {
	10_000
}

/// Longest accepted quote lifetime
pub const MAX_QUOTE_TTL_SECS: u64 = 86_400;

/// Route estimation configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RoutingSettings {
	/// Per-adapter quote timeout in milliseconds
	pub adapter_timeout_ms: u64,
	/// Quote lifetime; unset means staleness is the caller's risk
	pub quote_ttl_secs: Option<u64>,
}

impl Default for RoutingSettings {
	fn default() -> Self {
		Self {
			adapter_timeout_ms: 5_000,
			quote_ttl_secs: None,
		}
	}
}

/// Approval/send/claim execution configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutionSettings {
	/// Confirmation depth awaited on the approval before the send is submitted
	pub approval_confirmations: u64,
	/// Interval between approval receipt polls
	pub confirmation_poll_ms: u64,
	/// Maximum time to wait for the approval receipt
	pub confirmation_timeout_ms: u64,
}

impl Default for ExecutionSettings {
	fn default() -> Self {
		Self {
			approval_confirmations: 1,
			confirmation_poll_ms: 2_000,
			confirmation_timeout_ms: 180_000,
		}
	}
}

/// Transfer watcher polling configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WatcherSettings {
	/// Delays between polls; attempts past the schedule wait `max_backoff_ms`
	pub backoff_schedule_ms: Vec<u64>,
	/// Upper bound for any single delay and the delay once the schedule is exhausted
	pub max_backoff_ms: u64,
	/// Consecutive failed polls tolerated before the transfer fails
	pub max_consecutive_failures: u32,
	/// Timeout for a single chain or relay query
	pub request_timeout_ms: u64,
	/// Maximum time waiting for the source transaction to confirm
	pub source_timeout_secs: u64,
	/// Maximum time waiting on the bridge relay
	pub relay_timeout_secs: u64,
	/// Maximum time waiting for a claim or destination transaction to confirm
	pub destination_timeout_secs: u64,
}

impl Default for WatcherSettings {
	fn default() -> Self {
		Self {
			backoff_schedule_ms: vec![2_000, 4_000, 8_000, 15_000, 30_000],
			max_backoff_ms: 60_000,
			max_consecutive_failures: 10,
			request_timeout_ms: 10_000,
			source_timeout_secs: 1_800,
			relay_timeout_secs: 7_200,
			destination_timeout_secs: 3_600,
		}
	}
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
	pub structured: bool,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
			structured: false,
		}
	}
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

/// Settings validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
	#[error("{field} must be greater than zero")]
	ZeroValue { field: String },

	#[error("routing.quote_ttl_secs must be between 1 and {max}, got {value}")]
	QuoteTtlOutOfRange { value: u64, max: u64 },

	#[error("watcher.backoff_schedule_ms must not be empty")]
	EmptyBackoffSchedule,

	#[error("chains '{first}' and '{second}' both use chain id {chain_id}")]
	DuplicateChainId {
		chain_id: u64,
		first: String,
		second: String,
	},

	#[error("chain '{name}' endpoint could not be resolved: {source}")]
	UnresolvedEndpoint {
		name: String,
		source: ConfigurableValueError,
	},
}

/// Resolved chain entry ready to build a client
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChain {
	pub key: String,
	pub chain_id: u64,
	pub name: Option<String>,
	pub endpoint: String,
	pub request_timeout_ms: u64,
}

impl Settings {
	/// Get enabled chains only
	pub fn enabled_chains(&self) -> HashMap<String, ChainSettings> {
		self.chains
			.iter()
			.filter(|(_, config)| config.enabled)
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect()
	}

	/// Resolve endpoints of all enabled chains, sorted by chain id
	pub fn resolve_chains(&self) -> Result<Vec<ResolvedChain>, ConfigValidationError> {
		let mut resolved = Vec::new();
		for (key, chain) in self.enabled_chains() {
			let endpoint = chain.rpc_endpoint.resolve().map_err(|source| {
				ConfigValidationError::UnresolvedEndpoint {
					name: key.clone(),
					source,
				}
			})?;
			resolved.push(ResolvedChain {
				key,
				chain_id: chain.chain_id,
				name: chain.name,
				endpoint,
				request_timeout_ms: chain.request_timeout_ms,
			});
		}
		resolved.sort_by_key(|c| c.chain_id);
		Ok(resolved)
	}

	/// Check value ranges and chain id uniqueness
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		let non_zero = [
			("routing.adapter_timeout_ms", self.routing.adapter_timeout_ms),
			(
				"execution.confirmation_poll_ms",
				self.execution.confirmation_poll_ms,
			),
			(
				"execution.confirmation_timeout_ms",
				self.execution.confirmation_timeout_ms,
			),
			("watcher.max_backoff_ms", self.watcher.max_backoff_ms),
			("watcher.request_timeout_ms", self.watcher.request_timeout_ms),
			("watcher.source_timeout_secs", self.watcher.source_timeout_secs),
			("watcher.relay_timeout_secs", self.watcher.relay_timeout_secs),
			(
				"watcher.destination_timeout_secs",
				self.watcher.destination_timeout_secs,
			),
		];
		for (field, value) in non_zero {
			if value == 0 {
				return Err(ConfigValidationError::ZeroValue {
					field: field.to_string(),
				});
			}
		}

		if let Some(ttl) = self.routing.quote_ttl_secs {
			if ttl == 0 || ttl > MAX_QUOTE_TTL_SECS {
				return Err(ConfigValidationError::QuoteTtlOutOfRange {
					value: ttl,
					max: MAX_QUOTE_TTL_SECS,
				});
			}
		}

		if self.watcher.backoff_schedule_ms.is_empty() {
			return Err(ConfigValidationError::EmptyBackoffSchedule);
		}

		let mut seen: HashMap<u64, &str> = HashMap::new();
		let mut keys: Vec<&String> = self.chains.keys().collect();
		keys.sort();
		for key in keys {
			let chain = &self.chains[key];
			if !chain.enabled {
				continue;
			}
			if let Some(first) = seen.insert(chain.chain_id, key) {
				return Err(ConfigValidationError::DuplicateChainId {
					chain_id: chain.chain_id,
					first: first.to_string(),
					second: key.clone(),
				});
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chain(chain_id: u64, endpoint: &str) -> ChainSettings {
		ChainSettings {
			chain_id,
			name: None,
			rpc_endpoint: ConfigurableValue::from_plain(endpoint),
			enabled: true,
			request_timeout_ms: 10_000,
		}
	}

	#[test]
	fn test_defaults_are_valid() {
		let settings = Settings::default();
		assert!(settings.validate().is_ok());
		assert_eq!(settings.routing.adapter_timeout_ms, 5_000);
		assert_eq!(settings.routing.quote_ttl_secs, None);
		assert_eq!(settings.watcher.max_consecutive_failures, 10);
	}

	#[test]
	fn test_zero_timeout_rejected() {
		let mut settings = Settings::default();
		settings.routing.adapter_timeout_ms = 0;
		assert_eq!(
			settings.validate(),
			Err(ConfigValidationError::ZeroValue {
				field: "routing.adapter_timeout_ms".to_string()
			})
		);
	}

	#[test]
	fn test_quote_ttl_bounds() {
		let mut settings = Settings::default();
		for ttl in [0, MAX_QUOTE_TTL_SECS + 1, u64::MAX] {
			settings.routing.quote_ttl_secs = Some(ttl);
			assert_eq!(
				settings.validate(),
				Err(ConfigValidationError::QuoteTtlOutOfRange {
					value: ttl,
					max: MAX_QUOTE_TTL_SECS
				})
			);
		}

		settings.routing.quote_ttl_secs = Some(MAX_QUOTE_TTL_SECS);
		assert!(settings.validate().is_ok());
	}

	#[test]
	fn test_empty_backoff_rejected() {
		let mut settings = Settings::default();
		settings.watcher.backoff_schedule_ms.clear();
		assert_eq!(
			settings.validate(),
			Err(ConfigValidationError::EmptyBackoffSchedule)
		);
	}

	#[test]
	fn test_duplicate_chain_ids_rejected() {
		let mut settings = Settings::default();
		settings
			.chains
			.insert("polygon".to_string(), chain(137, "https://a"));
		settings
			.chains
			.insert("matic".to_string(), chain(137, "https://b"));
		assert!(matches!(
			settings.validate(),
			Err(ConfigValidationError::DuplicateChainId { chain_id: 137, .. })
		));

		settings.chains.get_mut("matic").unwrap().enabled = false;
		assert!(settings.validate().is_ok());
	}

	#[test]
	fn test_resolve_chains_sorted_and_filtered() {
		let mut settings = Settings::default();
		settings
			.chains
			.insert("polygon".to_string(), chain(137, "https://polygon"));
		settings
			.chains
			.insert("gnosis".to_string(), chain(100, "https://gnosis"));
		let mut disabled = chain(1, "https://eth");
		disabled.enabled = false;
		settings.chains.insert("ethereum".to_string(), disabled);

		let resolved = settings.resolve_chains().unwrap();
		let ids: Vec<u64> = resolved.iter().map(|c| c.chain_id).collect();
		assert_eq!(ids, vec![100, 137]);
		assert_eq!(resolved[1].endpoint, "https://polygon");
	}
}
