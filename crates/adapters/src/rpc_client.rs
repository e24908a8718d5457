//! JSON-RPC chain client for EVM-compatible chains
//!
//! Implements [`ChainClient`] on top of `eth_sendRawTransaction`,
//! `eth_getTransactionReceipt` and `eth_blockNumber`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use movr_types::{ChainClient, ChainError, ChainResult, SignedTransaction, TxReceipt, TxRef};
use reqwest::{
	header::{HeaderMap, HeaderValue},
	Client,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

const TRACING_TARGET: &str = "movr::rpc";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
	jsonrpc: &'static str,
	id: u64,
	method: &'a str,
	params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
	transaction_hash: String,
	block_number: Option<String>,
	status: Option<String>,
}

/// Chain client speaking Ethereum JSON-RPC over HTTP
#[derive(Debug)]
pub struct JsonRpcChainClient {
	chain_id: u64,
	endpoint: String,
	timeout_ms: u64,
	client: Client,
	next_id: AtomicU64,
}

impl JsonRpcChainClient {
	pub fn new(chain_id: u64, endpoint: impl Into<String>, timeout_ms: u64) -> ChainResult<Self> {
		let mut headers = HeaderMap::new();
		headers.insert("Content-Type", HeaderValue::from_static("application/json"));
		headers.insert("User-Agent", HeaderValue::from_static("movr/0.1"));

		let client = Client::builder()
			.default_headers(headers)
			.timeout(Duration::from_millis(timeout_ms))
			.build()
			.map_err(ChainError::HttpError)?;

		Ok(Self {
			chain_id,
			endpoint: endpoint.into(),
			timeout_ms,
			client,
			next_id: AtomicU64::new(1),
		})
	}

	async fn call(&self, method: &str, params: Value) -> ChainResult<Option<Value>> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request = RpcRequest {
			jsonrpc: "2.0",
			id,
			method,
			params,
		};

		debug!(target: TRACING_TARGET, chain_id = self.chain_id, method, id, "JSON-RPC request");

		let response = self
			.client
			.post(&self.endpoint)
			.json(&request)
			.send()
			.await
			.map_err(|e| self.map_http_error(e))?;

		if !response.status().is_success() {
			return Err(ChainError::InvalidResponse {
				chain_id: self.chain_id,
				reason: format!("endpoint returned status {}", response.status()),
			});
		}

		let body: RpcResponse = response.json().await.map_err(|e| ChainError::InvalidResponse {
			chain_id: self.chain_id,
			reason: format!("failed to parse JSON-RPC response: {}", e),
		})?;

		if let Some(error) = body.error {
			return Err(ChainError::Rpc {
				chain_id: self.chain_id,
				code: error.code,
				message: error.message,
			});
		}

		Ok(body.result.filter(|value| !value.is_null()))
	}

	fn map_http_error(&self, error: reqwest::Error) -> ChainError {
		if error.is_timeout() {
			ChainError::Timeout {
				timeout_ms: self.timeout_ms,
			}
		} else if error.is_connect() {
			ChainError::Connection(error.to_string())
		} else {
			ChainError::HttpError(error)
		}
	}

	fn expect_string(&self, value: Option<Value>, method: &str) -> ChainResult<String> {
		match value {
			Some(Value::String(s)) => Ok(s),
			other => Err(ChainError::InvalidResponse {
				chain_id: self.chain_id,
				reason: format!("{} returned {:?}, expected a string", method, other),
			}),
		}
	}
}

/// Parse a `0x`-prefixed hex quantity
pub(crate) fn parse_quantity(value: &str) -> Option<u64> {
	let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
	if digits.is_empty() {
		return None;
	}
	u64::from_str_radix(digits, 16).ok()
}

fn parse_receipt(chain_id: u64, receipt: RpcReceipt) -> ChainResult<Option<TxReceipt>> {
	// Pending transactions may be returned without a block
	let Some(block) = receipt.block_number else {
		return Ok(None);
	};
	let block_number = parse_quantity(&block).ok_or_else(|| ChainError::InvalidResponse {
		chain_id,
		reason: format!("invalid block number '{}'", block),
	})?;
	let success = match receipt.status.as_deref().map(parse_quantity) {
		Some(Some(status)) => status == 1,
		Some(None) => {
			return Err(ChainError::InvalidResponse {
				chain_id,
				reason: "invalid receipt status".to_string(),
			})
		},
		// Pre-Byzantium receipts carry no status
		None => true,
	};
	Ok(Some(TxReceipt {
		tx_ref: TxRef::new(receipt.transaction_hash),
		block_number,
		success,
	}))
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn submit_transaction(&self, tx: &SignedTransaction) -> ChainResult<TxRef> {
		if tx.chain_id != self.chain_id {
			return Err(ChainError::SubmissionRejected {
				chain_id: self.chain_id,
				reason: format!("transaction signed for chain {}", tx.chain_id),
			});
		}

		let result = match self
			.call("eth_sendRawTransaction", json!([tx.raw_hex()]))
			.await
		{
			Ok(result) => result,
			Err(ChainError::Rpc { message, .. }) => {
				warn!(target: TRACING_TARGET, chain_id = self.chain_id, kind = %tx.kind, reason = %message, "Transaction rejected");
				return Err(ChainError::SubmissionRejected {
					chain_id: self.chain_id,
					reason: message,
				});
			},
			Err(e) => return Err(e),
		};

		let hash = self.expect_string(result, "eth_sendRawTransaction")?;
		Ok(TxRef::new(hash))
	}

	async fn transaction_receipt(&self, tx_ref: &TxRef) -> ChainResult<Option<TxReceipt>> {
		let Some(result) = self
			.call("eth_getTransactionReceipt", json!([tx_ref.as_str()]))
			.await?
		else {
			return Ok(None);
		};
		let receipt: RpcReceipt = serde_json::from_value(result)?;
		parse_receipt(self.chain_id, receipt)
	}

	async fn current_height(&self) -> ChainResult<u64> {
		let result = self.call("eth_blockNumber", json!([])).await?;
		let height = self.expect_string(result, "eth_blockNumber")?;
		parse_quantity(&height).ok_or_else(|| ChainError::InvalidResponse {
			chain_id: self.chain_id,
			reason: format!("invalid block number '{}'", height),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_quantity() {
		assert_eq!(parse_quantity("0x0"), Some(0));
		assert_eq!(parse_quantity("0x1b4"), Some(436));
		assert_eq!(parse_quantity("0X10"), Some(16));
		assert_eq!(parse_quantity("0x"), None);
		assert_eq!(parse_quantity("1b4"), None);
		assert_eq!(parse_quantity("0xzz"), None);
	}

	#[test]
	fn test_parse_receipt() {
		let receipt: RpcReceipt = serde_json::from_value(json!({
			"transactionHash": "0xABCD",
			"blockNumber": "0x10",
			"status": "0x1"
		}))
		.unwrap();
		let parsed = parse_receipt(137, receipt).unwrap().unwrap();
		assert_eq!(parsed.tx_ref.as_str(), "0xabcd");
		assert_eq!(parsed.block_number, 16);
		assert!(parsed.success);

		let reverted: RpcReceipt = serde_json::from_value(json!({
			"transactionHash": "0x02d4",
			"blockNumber": "0x11",
			"status": "0x0"
		}))
		.unwrap();
		assert!(!parse_receipt(137, reverted).unwrap().unwrap().success);

		let pending: RpcReceipt = serde_json::from_value(json!({
			"transactionHash": "0x02d4",
			"blockNumber": null
		}))
		.unwrap();
		assert!(parse_receipt(137, pending).unwrap().is_none());
	}

	#[test]
	fn test_request_shape() {
		let request = RpcRequest {
			jsonrpc: "2.0",
			id: 7,
			method: "eth_blockNumber",
			params: json!([]),
		};
		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value["jsonrpc"], "2.0");
		assert_eq!(value["id"], 7);
		assert_eq!(value["method"], "eth_blockNumber");
	}

	#[tokio::test]
	async fn test_rejects_transaction_for_other_chain() {
		let client = JsonRpcChainClient::new(137, "http://127.0.0.1:1", 100).unwrap();
		let tx = SignedTransaction {
			kind: movr_types::TransactionKind::Send,
			chain_id: 100,
			raw: vec![0x01],
		};
		assert!(matches!(
			client.submit_transaction(&tx).await,
			Err(ChainError::SubmissionRejected { chain_id: 137, .. })
		));
	}
}
