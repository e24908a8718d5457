//! Core bridge adapter trait for bridge integrations

use async_trait::async_trait;
use std::fmt::Debug;

use super::{AdapterError, AdapterResult, BridgeQuote, RelayStatus};
use crate::models::{Amount, Chain, Token, TxRef, UnsignedTransaction};
use crate::routes::{CompletionProtocol, RouteQuote};

/// Interface every bridge integration implements
///
/// The mover never encodes bridge contracts itself; adapters build unsigned
/// transactions and report relay progress. Users add bridges by implementing
/// this trait and registering the adapter.
#[async_trait]
pub trait BridgeAdapter: Send + Sync + Debug {
	/// Unique bridge name used for registration and tie-breaking
	fn bridge_name(&self) -> &str;

	/// Whether the bridge serves this chain pair at all
	fn supports_route(&self, _source_chain: &Chain, _destination_chain: &Chain) -> bool {
		true
	}

	/// How transfers on this chain pair complete on the destination side
	fn completion_protocol(
		&self,
		source_chain: &Chain,
		destination_chain: &Chain,
	) -> CompletionProtocol;

	/// Confirmation depth required before a transaction on `chain` is treated as final
	fn min_confirmations(&self, _chain: &Chain) -> u64 {
		1
	}

	/// Quote moving `amount` of `token` between the chains
	async fn quote(
		&self,
		token: &Token,
		source_chain: &Chain,
		destination_chain: &Chain,
		amount: Amount,
	) -> AdapterResult<BridgeQuote>;

	/// Approval authorizing the bridge to move the route amount
	///
	/// `None` when no approval is needed (native asset, sufficient allowance).
	async fn build_approval(
		&self,
		route: &RouteQuote,
		owner: &str,
	) -> AdapterResult<Option<UnsignedTransaction>>;

	/// Bridge send transaction for the route
	async fn build_send(&self, route: &RouteQuote, sender: &str)
		-> AdapterResult<UnsignedTransaction>;

	/// Destination-side claim transaction for a two-step transfer
	///
	/// Default implementation returns UnsupportedOperation error.
	/// Override this method if the bridge has a claim step.
	async fn build_claim(
		&self,
		_source_tx: &TxRef,
		_source_chain: &Chain,
		_destination_chain: &Chain,
	) -> AdapterResult<UnsignedTransaction> {
		Err(AdapterError::UnsupportedOperation {
			operation: "build_claim".to_string(),
			bridge_name: self.bridge_name().to_string(),
		})
	}

	/// Relay/attestation progress of a source transaction
	async fn relay_status(
		&self,
		source_tx: &TxRef,
		source_chain: &Chain,
		destination_chain: &Chain,
	) -> AdapterResult<RelayStatus>;
}
