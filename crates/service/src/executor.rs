//! Approval, send and claim execution for chosen routes
//!
//! Every step is submitted sequentially and nothing is retried: resubmitting an
//! approval or a send is left to the caller.

use std::sync::Arc;

use movr_adapters::{AdapterRegistry, ChainRegistry, RegisteredChain};
use movr_types::{
	BridgeAdapter, Chain, RouteQuote, Signer, Token, TransactionKind, TransferError,
	TransferHandle, TransferKey, TransferResult, TxReceipt, TxRef, UnsignedTransaction,
};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

use crate::ledger::{ClaimReservation, TransferLedger};

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
	/// Confirmation depth awaited on approvals before sending
	pub approval_confirmations: u64,
	pub confirmation_poll_ms: u64,
	pub confirmation_timeout_ms: u64,
}

impl Default for ExecutorConfig {
	fn default() -> Self {
		Self {
			approval_confirmations: 1,
			confirmation_poll_ms: 2_000,
			confirmation_timeout_ms: 180_000,
		}
	}
}

/// Signs and submits the transactions of a transfer
pub struct TransferExecutor {
	chains: Arc<ChainRegistry>,
	adapters: Arc<AdapterRegistry>,
	signer: Arc<dyn Signer>,
	ledger: Arc<TransferLedger>,
	config: ExecutorConfig,
}

impl std::fmt::Debug for TransferExecutor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransferExecutor")
			.field("signer", &self.signer.address())
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl TransferExecutor {
	pub fn new(
		chains: Arc<ChainRegistry>,
		adapters: Arc<AdapterRegistry>,
		signer: Arc<dyn Signer>,
		ledger: Arc<TransferLedger>,
		config: ExecutorConfig,
	) -> Self {
		Self {
			chains,
			adapters,
			signer,
			ledger,
			config,
		}
	}

	/// Approve (when needed) and send `route`, returning the handle of the submitted transfer
	pub async fn send(
		&self,
		token: &Token,
		source_chain: &Chain,
		destination_chain: &Chain,
		route: &RouteQuote,
	) -> TransferResult<TransferHandle> {
		if !route.matches(token, source_chain, destination_chain) {
			return Err(TransferError::RouteMismatch {
				route_id: route.route_id.clone(),
				reason: format!(
					"route moves {} from chain {} to chain {}, requested {} from chain {} to chain {}",
					route.token,
					route.source_chain.chain_id,
					route.destination_chain.chain_id,
					token,
					source_chain.chain_id,
					destination_chain.chain_id
				),
			});
		}
		if route.is_expired() {
			return Err(TransferError::QuoteExpired {
				route_id: route.route_id.clone(),
			});
		}

		let adapter = self.adapter(&route.bridge_name)?;
		let source = self.chain(source_chain.chain_id)?;
		self.chain(destination_chain.chain_id)?;
		let sender = self.signer.address().to_string();

		info!(
			route_id = %route.route_id,
			bridge = %route.bridge_name,
			amount = %route.amount,
			source_chain_id = source_chain.chain_id,
			destination_chain_id = destination_chain.chain_id,
			"Executing transfer"
		);

		if let Some(approval) = adapter.build_approval(route, &sender).await? {
			let approval_tx = self.sign_and_submit(&source, approval).await?;
			self.wait_for_confirmation(
				&source,
				&approval_tx,
				TransactionKind::Approval,
				self.config.approval_confirmations,
			)
			.await?;
		} else {
			debug!(route_id = %route.route_id, "No approval required");
		}

		let send = adapter.build_send(route, &sender).await?;
		let source_tx = self.sign_and_submit(&source, send).await?;

		let handle = TransferHandle {
			source_tx,
			source_chain: source_chain.clone(),
			destination_chain: destination_chain.clone(),
			token: token.clone(),
			bridge_name: route.bridge_name.clone(),
			completion_protocol: route.completion_protocol,
		};
		let handle = self.ledger.track(handle);

		info!(
			source_tx = %handle.source_tx,
			bridge = %handle.bridge_name,
			requires_claim = handle.requires_claim(),
			"Transfer submitted"
		);

		Ok(handle)
	}

	/// Submit the destination claim of a tracked two-step transfer
	pub async fn claim(
		&self,
		source_tx: &TxRef,
		source_chain: &Chain,
		destination_chain: &Chain,
	) -> TransferResult<TxRef> {
		let key = TransferKey::new(source_chain.chain_id, source_tx);
		let handle = match self.ledger.handle(&key) {
			Some(handle) if handle.destination_chain == *destination_chain => handle,
			_ => return Err(TransferError::UnknownTransfer { key }),
		};

		if !handle.requires_claim() {
			return Err(TransferError::ClaimNotRequired {
				source_tx: handle.source_tx,
				bridge_name: handle.bridge_name,
			});
		}

		if let ClaimReservation::Taken(claim_tx) = self.ledger.reserve_claim(&key) {
			return Err(TransferError::ClaimAlreadySubmitted {
				source_tx: handle.source_tx,
				claim_tx,
			});
		}

		match self.submit_claim(&handle).await {
			Ok(claim_tx) => {
				self.ledger.record_claim(&key, claim_tx.clone());
				info!(source_tx = %handle.source_tx, claim_tx = %claim_tx, "Claim submitted");
				Ok(claim_tx)
			},
			Err(e) => {
				self.ledger.release_claim(&key);
				warn!(source_tx = %handle.source_tx, error = %e, "Claim failed, reservation released");
				Err(e)
			},
		}
	}

	/// Register a handle created outside this executor
	pub fn track(&self, handle: TransferHandle) -> TransferHandle {
		self.ledger.track(handle)
	}

	/// Stop tracking a transfer; returns its handle if it was tracked
	pub fn forget(&self, handle: &TransferHandle) -> Option<TransferHandle> {
		self.ledger.forget(&handle.key())
	}

	async fn submit_claim(&self, handle: &TransferHandle) -> TransferResult<TxRef> {
		let adapter = self.adapter(&handle.bridge_name)?;
		let destination = self.chain(handle.destination_chain.chain_id)?;
		let claim = adapter
			.build_claim(
				&handle.source_tx,
				&handle.source_chain,
				&handle.destination_chain,
			)
			.await?;
		self.sign_and_submit(&destination, claim).await
	}

	async fn sign_and_submit(
		&self,
		chain: &RegisteredChain,
		unsigned: UnsignedTransaction,
	) -> TransferResult<TxRef> {
		let kind = unsigned.kind;
		let signed = self.signer.sign(&chain.chain, &unsigned).await?;
		let tx_ref = chain.client.submit_transaction(&signed).await?;
		debug!(chain_id = chain.chain.chain_id, kind = %kind, tx_ref = %tx_ref, "Transaction submitted");
		Ok(tx_ref)
	}

	async fn wait_for_confirmation(
		&self,
		chain: &RegisteredChain,
		tx_ref: &TxRef,
		kind: TransactionKind,
		required: u64,
	) -> TransferResult<TxReceipt> {
		let chain_id = chain.chain.chain_id;
		let poll = Duration::from_millis(self.config.confirmation_poll_ms);
		let client = chain.client.clone();

		let wait = async {
			loop {
				match client.confirmation_depth(tx_ref).await {
					Ok(Some((receipt, _))) if !receipt.success => {
						return Err(TransferError::TransactionReverted {
							chain_id,
							kind,
							tx_ref: tx_ref.clone(),
						});
					},
					Ok(Some((receipt, confirmations))) if confirmations >= required => {
						return Ok(receipt);
					},
					Ok(_) => {},
					Err(e) => {
						warn!(chain_id, tx_ref = %tx_ref, error = %e, "Receipt poll failed");
					},
				}
				sleep(poll).await;
			}
		};

		match timeout(Duration::from_millis(self.config.confirmation_timeout_ms), wait).await {
			Ok(result) => result,
			Err(_) => Err(TransferError::ConfirmationTimeout {
				chain_id,
				tx_ref: tx_ref.clone(),
				timeout_ms: self.config.confirmation_timeout_ms,
			}),
		}
	}

	fn adapter(&self, bridge_name: &str) -> TransferResult<Arc<dyn BridgeAdapter>> {
		self.adapters
			.get(bridge_name)
			.ok_or_else(|| TransferError::UnknownBridge {
				bridge_name: bridge_name.to_string(),
			})
	}

	fn chain(&self, chain_id: u64) -> TransferResult<RegisteredChain> {
		self.chains
			.get(chain_id)
			.cloned()
			.ok_or(TransferError::UnknownChain { chain_id })
	}
}
