//! Startup logging for processes embedding the mover
//!
//! Logs the package version, platform details and a summary of the loaded
//! settings. Endpoints are never logged, only where they come from.

use std::env;
use tracing::info;

use crate::settings::Settings;

/// Logs service information at startup
pub fn log_service_info() {
	let service_name = "movr";
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== Movr Starting ===");
	info!("🚀 Service: {} v{}", service_name, service_version);
	info!("💻 Platform: {}", env::consts::OS);
	info!("🏗️ Architecture: {}", env::consts::ARCH);

	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("🔧 Log Level: {}", rust_log);
	}

	if let Ok(config_path) = env::var("CONFIG_PATH") {
		info!("📋 Config Path: {}", config_path);
	}

	info!(
		"🕒 Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs the effective configuration without secrets
pub fn log_settings_summary(settings: &Settings) {
	let mut chains: Vec<_> = settings.enabled_chains().into_iter().collect();
	chains.sort_by_key(|(_, chain)| chain.chain_id);
	for (key, chain) in chains {
		info!(
			chain = %key,
			chain_id = chain.chain_id,
			endpoint_source = %chain.rpc_endpoint.description(),
			"⛓️ Chain configured"
		);
	}
	info!(
		adapter_timeout_ms = settings.routing.adapter_timeout_ms,
		quote_ttl_secs = ?settings.routing.quote_ttl_secs,
		"🧭 Routing configured"
	);
	info!(
		backoff_schedule_ms = ?settings.watcher.backoff_schedule_ms,
		max_consecutive_failures = settings.watcher.max_consecutive_failures,
		"👀 Watcher configured"
	);
}

/// Logs that the mover is ready
pub fn log_startup_complete(adapter_count: usize, chain_count: usize) {
	info!("✅ Movr Started Successfully");
	info!(
		"📡 Ready with {} bridge adapter(s) on {} chain(s)",
		adapter_count, chain_count
	);
}
