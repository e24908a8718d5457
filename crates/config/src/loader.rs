//! Configuration loading utilities
//!
//! Settings are read from an optional `config/movr.{toml,json,yaml}` file and
//! then overridden by `MOVR__SECTION__KEY` environment variables.

use crate::settings::{ConfigValidationError, Settings};
use config::{Config, ConfigError, Environment, File, FileFormat};
use thiserror::Error;
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config/movr";
const ENV_PREFIX: &str = "MOVR";

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum ConfigLoadError {
	#[error("Failed to read configuration: {0}")]
	Config(#[from] ConfigError),

	#[error("Invalid configuration: {0}")]
	Validation(#[from] ConfigValidationError),
}

/// Load configuration from the default file location and environment
pub fn load_config() -> Result<Settings, ConfigLoadError> {
	let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
	load_config_from(&path)
}

/// Load configuration from `path` (extension optional) and environment
pub fn load_config_from(path: &str) -> Result<Settings, ConfigLoadError> {
	debug!(config_path = %path, "Loading configuration");
	let s = Config::builder()
		.add_source(File::with_name(path).required(false))
		.add_source(environment())
		.build()?;

	finish(s)
}

/// Parse configuration from an in-memory document, still honouring environment overrides
pub fn parse_config(contents: &str, format: FileFormat) -> Result<Settings, ConfigLoadError> {
	let s = Config::builder()
		.add_source(File::from_str(contents, format))
		.add_source(environment())
		.build()?;

	finish(s)
}

fn environment() -> Environment {
	Environment::with_prefix(ENV_PREFIX)
		.prefix_separator("__")
		.separator("__")
		.try_parsing(true)
		.list_separator(",")
		.with_list_parse_key("watcher.backoff_schedule_ms")
}

fn finish(s: Config) -> Result<Settings, ConfigLoadError> {
	let settings: Settings = s.try_deserialize()?;
	settings.validate()?;
	Ok(settings)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::settings::LogFormat;

	#[test]
	fn test_parse_partial_toml_uses_defaults() {
		let settings = parse_config(
			r#"
[logging]
level = "debug"
format = "json"

[routing]
adapter_timeout_ms = 750
quote_ttl_secs = 30

[chains.polygon]
chain_id = 137
name = "Polygon"
rpc_endpoint = { type = "plain", value = "https://polygon-rpc.com" }

[chains.gnosis]
chain_id = 100
rpc_endpoint = { type = "env", value = "XDAI_RPC_NODE" }
enabled = false
"#,
			FileFormat::Toml,
		)
		.unwrap();

		assert_eq!(settings.logging.level, "debug");
		assert_eq!(settings.logging.format, LogFormat::Json);
		assert_eq!(settings.routing.adapter_timeout_ms, 750);
		assert_eq!(settings.routing.quote_ttl_secs, Some(30));
		assert_eq!(settings.execution.approval_confirmations, 1);
		assert_eq!(settings.chains.len(), 2);
		assert_eq!(settings.enabled_chains().len(), 1);
		assert_eq!(settings.chains["polygon"].request_timeout_ms, 10_000);
	}

	#[test]
	fn test_invalid_values_fail_validation() {
		let result = parse_config(
			r#"
[watcher]
source_timeout_secs = 0
"#,
			FileFormat::Toml,
		);
		assert!(matches!(result, Err(ConfigLoadError::Validation(_))));
	}

	#[test]
	fn test_missing_file_falls_back_to_defaults() {
		let settings = load_config_from("config/does-not-exist").unwrap();
		assert_eq!(settings.routing.adapter_timeout_ms, 5_000);
		assert!(settings.chains.is_empty());
	}
}
