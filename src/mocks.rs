//! Mock capabilities for examples and testing
//!
//! In-memory chain clients, a signer and a scriptable bridge adapter. Chains
//! are driven by hand: tests include transactions, advance the height and
//! set the relay status the adapter reports.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use movr_types::{
	AdapterError, AdapterResult, Amount, BridgeAdapter, BridgeQuote, Chain, ChainClient,
	ChainError, ChainResult, CompletionProtocol, RelayStatus, RouteQuote, SignedTransaction,
	Signer, SignerError, Token, TransactionKind, TxReceipt, TxRef, UnsignedTransaction,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct ChainState {
	height: u64,
	next_nonce: u64,
	receipts: HashMap<TxRef, TxReceipt>,
	submitted: Vec<(TxRef, SignedTransaction)>,
	auto_include: Option<bool>,
	reject_submissions: Option<String>,
	failing_reads: u32,
}

/// In-memory chain
#[derive(Debug)]
pub struct MockChainClient {
	chain_id: u64,
	state: Mutex<ChainState>,
}

impl MockChainClient {
	pub fn new(chain_id: u64) -> Self {
		Self {
			chain_id,
			state: Mutex::new(ChainState {
				height: 100,
				..ChainState::default()
			}),
		}
	}

	/// Include every submitted transaction right away with the given outcome
	pub fn auto_include(self, success: bool) -> Self {
		lock(&self.state).auto_include = Some(success);
		self
	}

	pub fn height(&self) -> u64 {
		lock(&self.state).height
	}

	pub fn advance(&self, blocks: u64) {
		lock(&self.state).height += blocks;
	}

	/// Include `tx_ref` in the current block
	pub fn include(&self, tx_ref: &TxRef, success: bool) {
		let mut state = lock(&self.state);
		let block_number = state.height;
		state.receipts.insert(
			tx_ref.clone(),
			TxReceipt {
				tx_ref: tx_ref.clone(),
				block_number,
				success,
			},
		);
	}

	pub fn reject_submissions(&self, reason: &str) {
		lock(&self.state).reject_submissions = Some(reason.to_string());
	}

	pub fn accept_submissions(&self) {
		lock(&self.state).reject_submissions = None;
	}

	/// Fail the next `count` receipt or height queries
	pub fn fail_reads(&self, count: u32) {
		lock(&self.state).failing_reads = count;
	}

	pub fn submitted(&self) -> Vec<(TxRef, SignedTransaction)> {
		lock(&self.state).submitted.clone()
	}

	pub fn submitted_kinds(&self) -> Vec<TransactionKind> {
		lock(&self.state)
			.submitted
			.iter()
			.map(|(_, tx)| tx.kind)
			.collect()
	}

	fn read(&self) -> ChainResult<MutexGuard<'_, ChainState>> {
		let mut state = lock(&self.state);
		if state.failing_reads > 0 {
			state.failing_reads -= 1;
			return Err(ChainError::Connection(format!(
				"chain {} unreachable",
				self.chain_id
			)));
		}
		Ok(state)
	}
}

#[async_trait]
impl ChainClient for MockChainClient {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn submit_transaction(&self, tx: &SignedTransaction) -> ChainResult<TxRef> {
		let mut state = lock(&self.state);
		if let Some(reason) = &state.reject_submissions {
			return Err(ChainError::SubmissionRejected {
				chain_id: self.chain_id,
				reason: reason.clone(),
			});
		}

		state.next_nonce += 1;
		let tx_ref = TxRef::new(format!("0x{:x}{:08x}", self.chain_id, state.next_nonce));
		state.submitted.push((tx_ref.clone(), tx.clone()));

		if let Some(success) = state.auto_include {
			let block_number = state.height;
			state.receipts.insert(
				tx_ref.clone(),
				TxReceipt {
					tx_ref: tx_ref.clone(),
					block_number,
					success,
				},
			);
		}
		Ok(tx_ref)
	}

	async fn transaction_receipt(&self, tx_ref: &TxRef) -> ChainResult<Option<TxReceipt>> {
		Ok(self.read()?.receipts.get(tx_ref).cloned())
	}

	async fn current_height(&self) -> ChainResult<u64> {
		Ok(self.read()?.height)
	}
}

/// Signer that wraps the unsigned payload without real cryptography
#[derive(Debug)]
pub struct MockSigner {
	address: String,
	rejecting: Mutex<bool>,
	signed: Mutex<Vec<UnsignedTransaction>>,
}

impl MockSigner {
	pub fn new(address: &str) -> Self {
		Self {
			address: address.to_lowercase(),
			rejecting: Mutex::new(false),
			signed: Mutex::new(Vec::new()),
		}
	}

	/// Refuse every following signing request
	pub fn reject(&self, rejecting: bool) {
		*lock(&self.rejecting) = rejecting;
	}

	pub fn signed(&self) -> Vec<UnsignedTransaction> {
		lock(&self.signed).clone()
	}
}

impl Default for MockSigner {
	fn default() -> Self {
		Self::new("0x00000000000000000000000000000000000000a1")
	}
}

#[async_trait]
impl Signer for MockSigner {
	fn address(&self) -> &str {
		&self.address
	}

	async fn sign(
		&self,
		chain: &Chain,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, SignerError> {
		if *lock(&self.rejecting) {
			return Err(SignerError::SigningRejected {
				chain_id: chain.chain_id,
				reason: "user rejected the request".to_string(),
			});
		}
		if tx.chain_id != chain.chain_id {
			return Err(SignerError::UnsupportedChain {
				chain_id: tx.chain_id,
			});
		}

		lock(&self.signed).push(tx.clone());
		let mut raw = tx.to.as_bytes().to_vec();
		raw.extend_from_slice(&tx.data);
		Ok(SignedTransaction {
			kind: tx.kind,
			chain_id: chain.chain_id,
			raw,
		})
	}
}

/// How a [`MockBridgeAdapter`] answers quote requests
#[derive(Debug, Clone)]
pub enum QuoteBehaviour {
	Quote {
		estimated_output: Amount,
		fee: Amount,
		eta_seconds: u64,
	},
	Fail,
	/// Never answers within any reasonable adapter timeout
	Hang,
}

#[derive(Debug)]
struct AdapterState {
	quote: QuoteBehaviour,
	relay: RelayStatus,
	relay_failures: u32,
	claims_built: u32,
}

/// Scriptable bridge adapter
#[derive(Debug)]
pub struct MockBridgeAdapter {
	name: String,
	protocol: CompletionProtocol,
	requires_approval: bool,
	min_confirmations: u64,
	supported_chains: Option<Vec<u64>>,
	state: Mutex<AdapterState>,
}

impl MockBridgeAdapter {
	pub fn new(name: &str, protocol: CompletionProtocol) -> Self {
		Self {
			name: name.to_string(),
			protocol,
			requires_approval: true,
			min_confirmations: 1,
			supported_chains: None,
			state: Mutex::new(AdapterState {
				quote: QuoteBehaviour::Fail,
				relay: RelayStatus::Pending,
				relay_failures: 0,
				claims_built: 0,
			}),
		}
	}

	pub fn one_step(name: &str) -> Self {
		Self::new(name, CompletionProtocol::OneStep)
	}

	pub fn two_step(name: &str) -> Self {
		Self::new(name, CompletionProtocol::TwoStepClaim)
	}

	/// Quote `estimated_output` with the remainder of 1 USDC as fee
	pub fn quoting(self, estimated_output: u128, eta_seconds: u64) -> Self {
		self.with_quote(QuoteBehaviour::Quote {
			estimated_output: Amount::new(estimated_output),
			fee: Amount::new(1_000_000u128.saturating_sub(estimated_output)),
			eta_seconds,
		})
	}

	pub fn with_quote(self, quote: QuoteBehaviour) -> Self {
		lock(&self.state).quote = quote;
		self
	}

	pub fn without_approval(mut self) -> Self {
		self.requires_approval = false;
		self
	}

	pub fn with_min_confirmations(mut self, confirmations: u64) -> Self {
		self.min_confirmations = confirmations;
		self
	}

	/// Only serve routes between these chains
	pub fn serving(mut self, chain_ids: &[u64]) -> Self {
		self.supported_chains = Some(chain_ids.to_vec());
		self
	}

	pub fn set_relay_status(&self, status: RelayStatus) {
		lock(&self.state).relay = status;
	}

	/// Fail the next `count` relay status queries
	pub fn fail_relay(&self, count: u32) {
		lock(&self.state).relay_failures = count;
	}

	pub fn claims_built(&self) -> u32 {
		lock(&self.state).claims_built
	}

	fn contract(&self) -> String {
		format!("0x{:0>40}", hex_name(&self.name))
	}
}

fn hex_name(name: &str) -> String {
	name.bytes()
		.take(20)
		.map(|b| format!("{:02x}", b))
		.collect()
}

#[async_trait]
impl BridgeAdapter for MockBridgeAdapter {
	fn bridge_name(&self) -> &str {
		&self.name
	}

	fn supports_route(&self, source_chain: &Chain, destination_chain: &Chain) -> bool {
		match &self.supported_chains {
			Some(ids) => {
				ids.contains(&source_chain.chain_id) && ids.contains(&destination_chain.chain_id)
			},
			None => true,
		}
	}

	fn completion_protocol(&self, _: &Chain, _: &Chain) -> CompletionProtocol {
		self.protocol
	}

	fn min_confirmations(&self, _chain: &Chain) -> u64 {
		self.min_confirmations
	}

	async fn quote(
		&self,
		_token: &Token,
		_source_chain: &Chain,
		_destination_chain: &Chain,
		_amount: Amount,
	) -> AdapterResult<BridgeQuote> {
		let behaviour = lock(&self.state).quote.clone();
		match behaviour {
			QuoteBehaviour::Quote {
				estimated_output,
				fee,
				eta_seconds,
			} => Ok(BridgeQuote::new(estimated_output, fee, eta_seconds)),
			QuoteBehaviour::Fail => Err(AdapterError::QuoteFailed {
				bridge_name: self.name.clone(),
				reason: "no liquidity".to_string(),
			}),
			QuoteBehaviour::Hang => {
				tokio::time::sleep(Duration::from_secs(3_600)).await;
				Err(AdapterError::Network("no answer".to_string()))
			},
		}
	}

	async fn build_approval(
		&self,
		route: &RouteQuote,
		_owner: &str,
	) -> AdapterResult<Option<UnsignedTransaction>> {
		if !self.requires_approval || route.token.is_native() {
			return Ok(None);
		}
		Ok(Some(UnsignedTransaction::new(
			TransactionKind::Approval,
			route.source_chain.chain_id,
			route.token.address.clone(),
			route.amount.to_string().into_bytes(),
		)))
	}

	async fn build_send(&self, route: &RouteQuote, sender: &str) -> AdapterResult<UnsignedTransaction> {
		let mut data = sender.as_bytes().to_vec();
		data.extend_from_slice(route.route_id.as_bytes());
		let tx = UnsignedTransaction::new(
			TransactionKind::Send,
			route.source_chain.chain_id,
			self.contract(),
			data,
		);
		if route.token.is_native() {
			Ok(tx.with_value(route.amount))
		} else {
			Ok(tx)
		}
	}

	async fn build_claim(
		&self,
		source_tx: &TxRef,
		_source_chain: &Chain,
		destination_chain: &Chain,
	) -> AdapterResult<UnsignedTransaction> {
		if !self.protocol.requires_claim() {
			return Err(AdapterError::UnsupportedOperation {
				operation: "build_claim".to_string(),
				bridge_name: self.name.clone(),
			});
		}
		lock(&self.state).claims_built += 1;
		Ok(UnsignedTransaction::new(
			TransactionKind::Claim,
			destination_chain.chain_id,
			self.contract(),
			source_tx.as_str().as_bytes().to_vec(),
		))
	}

	async fn relay_status(
		&self,
		_source_tx: &TxRef,
		_source_chain: &Chain,
		_destination_chain: &Chain,
	) -> AdapterResult<RelayStatus> {
		let mut state = lock(&self.state);
		if state.relay_failures > 0 {
			state.relay_failures -= 1;
			return Err(AdapterError::RelayUnavailable {
				reason: "attestation service unavailable".to_string(),
			});
		}
		Ok(state.relay.clone())
	}
}
