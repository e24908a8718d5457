//! Transaction references, receipts and signing payloads

use serde::{Deserialize, Serialize};

use super::Amount;

/// Reference to a submitted transaction (its hash), lower-cased
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
	pub fn new(hash: impl AsRef<str>) -> Self {
		Self(hash.as_ref().trim().to_lowercase())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for TxRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for TxRef {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for TxRef {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

/// Receipt of an included transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
	pub tx_ref: TxRef,
	/// Block the transaction was included in
	pub block_number: u64,
	/// False when execution reverted
	pub success: bool,
}

impl TxReceipt {
	/// Confirmation depth given the chain's current height
	///
	/// The inclusion block itself counts as the first confirmation.
	pub fn confirmations(&self, current_height: u64) -> u64 {
		if current_height < self.block_number {
			0
		} else {
			current_height - self.block_number + 1
		}
	}
}

/// Role of a transaction in a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
	Approval,
	Send,
	Claim,
}

impl std::fmt::Display for TransactionKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TransactionKind::Approval => f.write_str("approval"),
			TransactionKind::Send => f.write_str("send"),
			TransactionKind::Claim => f.write_str("claim"),
		}
	}
}

/// Transaction built by a bridge adapter, not yet signed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
	pub kind: TransactionKind,
	pub chain_id: u64,
	/// Target contract
	pub to: String,
	/// ABI-encoded call data
	#[serde(with = "hex_bytes")]
	pub data: Vec<u8>,
	/// Native value attached to the call
	pub value: Amount,
}

impl UnsignedTransaction {
	pub fn new(kind: TransactionKind, chain_id: u64, to: impl Into<String>, data: Vec<u8>) -> Self {
		Self {
			kind,
			chain_id,
			to: to.into(),
			data,
			value: Amount::ZERO,
		}
	}

	pub fn with_value(mut self, value: Amount) -> Self {
		self.value = value;
		self
	}
}

/// Signed, broadcast-ready transaction payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
	pub kind: TransactionKind,
	pub chain_id: u64,
	#[serde(with = "hex_bytes")]
	pub raw: Vec<u8>,
}

impl SignedTransaction {
	/// `0x`-prefixed hex encoding of the raw payload
	pub fn raw_hex(&self) -> String {
		format!("0x{}", hex::encode(&self.raw))
	}
}

mod hex_bytes {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;
		let trimmed = value.strip_prefix("0x").unwrap_or(&value);
		hex::decode(trimmed).map_err(serde::de::Error::custom)
	}
}
