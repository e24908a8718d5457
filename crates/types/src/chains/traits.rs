//! Capability traits for chain access and transaction signing

use async_trait::async_trait;

use super::{ChainResult, SignerError};
use crate::models::{Chain, SignedTransaction, TxReceipt, TxRef, UnsignedTransaction};

/// Read/submit access to one blockchain
///
/// Implementations are shared between the route engine, the executor and any
/// number of watchers, so they must be safe for concurrent use.
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Chain this client is connected to
	fn chain_id(&self) -> u64;

	/// Broadcast a signed transaction and return its reference
	async fn submit_transaction(&self, tx: &SignedTransaction) -> ChainResult<TxRef>;

	/// Fetch the receipt of a transaction, `None` while it is not yet included
	async fn transaction_receipt(&self, tx_ref: &TxRef) -> ChainResult<Option<TxReceipt>>;

	/// Current block height
	async fn current_height(&self) -> ChainResult<u64>;

	/// Receipt together with its confirmation depth
	///
	/// Default implementation combines `transaction_receipt` and `current_height`.
	async fn confirmation_depth(&self, tx_ref: &TxRef) -> ChainResult<Option<(TxReceipt, u64)>> {
		let receipt = match self.transaction_receipt(tx_ref).await? {
			Some(receipt) => receipt,
			None => return Ok(None),
		};
		let height = self.current_height().await?;
		let confirmations = receipt.confirmations(height);
		Ok(Some((receipt, confirmations)))
	}
}

/// Wallet capability that signs transactions for a chain
#[async_trait]
pub trait Signer: Send + Sync {
	/// Address of the sending account
	fn address(&self) -> &str;

	/// Sign an unsigned transaction for `chain`
	async fn sign(
		&self,
		chain: &Chain,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, SignerError>;
}
