//! Route estimation across all registered bridge adapters

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use movr_adapters::AdapterRegistry;
use movr_types::{
	AdapterError, Amount, Chain, RouteError, RouteQuote, RouteRequest, RouteResult,
	RouteSelectionPolicy, Token,
};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Route engine configuration
#[derive(Debug, Clone)]
pub struct RouteEngineConfig {
	/// Per-adapter quote timeout
	pub adapter_timeout_ms: u64,
	/// Stamps `expires_at` on every quote when set
	pub quote_ttl_secs: Option<u64>,
}

impl Default for RouteEngineConfig {
	fn default() -> Self {
		Self {
			adapter_timeout_ms: 5_000,
			quote_ttl_secs: None,
		}
	}
}

/// Fans a route request out to every adapter and ranks the answers
#[derive(Debug, Clone)]
pub struct RouteEngine {
	adapters: Arc<AdapterRegistry>,
	config: RouteEngineConfig,
}

impl RouteEngine {
	pub fn new(adapters: Arc<AdapterRegistry>, config: RouteEngineConfig) -> Self {
		Self { adapters, config }
	}

	/// Quote a transfer on every adapter serving the chain pair, best route first
	pub async fn estimate(
		&self,
		token: &Token,
		source_chain: &Chain,
		destination_chain: &Chain,
		amount: Amount,
		policy: RouteSelectionPolicy,
	) -> RouteResult<Vec<RouteQuote>> {
		let request = RouteRequest::new(
			token.clone(),
			source_chain.clone(),
			destination_chain.clone(),
			amount,
		);
		request.validate()?;

		let adapters: Vec<_> = self
			.adapters
			.all()
			.into_iter()
			.filter(|adapter| {
				let supported = adapter.supports_route(source_chain, destination_chain);
				if !supported {
					debug!(
						bridge = adapter.bridge_name(),
						source_chain_id = source_chain.chain_id,
						destination_chain_id = destination_chain.chain_id,
						"Skipping adapter without support for chain pair"
					);
				}
				supported
			})
			.collect();

		info!(
			token = %token,
			amount = %amount,
			source_chain_id = source_chain.chain_id,
			destination_chain_id = destination_chain.chain_id,
			adapters = adapters.len(),
			"Estimating routes"
		);

		let timeout_ms = self.config.adapter_timeout_ms;
		let quote_ttl = self.config.quote_ttl_secs;

		let tasks = adapters.into_iter().map(|adapter| {
			let request = request.clone();

			tokio::spawn(async move {
				let bridge_name = adapter.bridge_name().to_string();
				let quote = adapter.quote(
					&request.token,
					&request.source_chain,
					&request.destination_chain,
					request.amount,
				);

				let raw = match timeout(Duration::from_millis(timeout_ms), quote).await {
					Ok(Ok(raw)) => raw,
					Ok(Err(e)) => {
						warn!(bridge = %bridge_name, error = %e, "Adapter quote failed");
						return None;
					},
					Err(_) => {
						let e = AdapterError::Timeout { timeout_ms };
						warn!(bridge = %bridge_name, error = %e, "Adapter quote timed out");
						return None;
					},
				};

				if raw.estimated_output.is_zero() {
					debug!(bridge = %bridge_name, "Discarding quote with zero output");
					return None;
				}

				let quoted_at = Utc::now();
				let expires_at = quote_ttl.and_then(|secs| quote_expiry(quoted_at, secs));

				Some(RouteQuote {
					route_id: Uuid::new_v4().to_string(),
					completion_protocol: adapter
						.completion_protocol(&request.source_chain, &request.destination_chain),
					bridge_name,
					token: request.token,
					source_chain: request.source_chain,
					destination_chain: request.destination_chain,
					amount: request.amount,
					estimated_output: raw.estimated_output,
					fee: raw.fee,
					eta_seconds: raw.eta_seconds,
					quoted_at,
					expires_at,
				})
			})
		});

		let mut quotes: Vec<RouteQuote> = join_all(tasks)
			.await
			.into_iter()
			.filter_map(|result| match result {
				Ok(quote) => quote,
				Err(e) => {
					warn!(error = %e, "Adapter quote task aborted");
					None
				},
			})
			.collect();

		if quotes.is_empty() {
			return Err(RouteError::NoRouteAvailable {
				source_chain_id: source_chain.chain_id,
				destination_chain_id: destination_chain.chain_id,
			});
		}

		policy.rank(&mut quotes);

		info!(
			routes = quotes.len(),
			best_bridge = %quotes[0].bridge_name,
			policy = ?policy,
			"Route estimation completed"
		);

		Ok(quotes)
	}
}

/// `None` when the lifetime does not fit a timestamp; such a quote never expires
fn quote_expiry(quoted_at: DateTime<Utc>, ttl_secs: u64) -> Option<DateTime<Utc>> {
	let expiry = i64::try_from(ttl_secs)
		.ok()
		.and_then(chrono::Duration::try_seconds)
		.and_then(|ttl| quoted_at.checked_add_signed(ttl));
	if expiry.is_none() {
		warn!(ttl_secs, "Quote TTL out of range, leaving quote without expiry");
	}
	expiry
}
