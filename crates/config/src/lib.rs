//! Movr Configuration
//!
//! Settings, loading and startup logging for the cross-chain token mover.

pub mod configurable_value;
pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use configurable_value::{ConfigurableValue, ConfigurableValueError, ValueType};
pub use loader::{load_config, load_config_from, parse_config, ConfigLoadError};
pub use settings::{
	ChainSettings, ConfigValidationError, ExecutionSettings, LogFormat, LoggingSettings,
	ResolvedChain, RoutingSettings, Settings, WatcherSettings, MAX_QUOTE_TTL_SECS,
};
pub use startup_logger::{log_service_info, log_settings_summary, log_startup_complete};

pub use config::FileFormat;
