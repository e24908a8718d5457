//! Raw adapter responses before normalization

use serde::{Deserialize, Serialize};

use crate::models::{Amount, TxRef};

/// Quote as returned by a bridge integration
///
/// The route engine stamps it with the bridge name, request context and
/// completion protocol to produce a `RouteQuote`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeQuote {
	pub estimated_output: Amount,
	pub fee: Amount,
	pub eta_seconds: u64,
}

impl BridgeQuote {
	pub fn new(estimated_output: Amount, fee: Amount, eta_seconds: u64) -> Self {
		Self {
			estimated_output,
			fee,
			eta_seconds,
		}
	}
}

/// Bridge relay/attestation progress for a source transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelayStatus {
	/// Relay has not attested the source event yet
	Pending,
	/// Attested; a destination claim transaction may now be submitted
	ClaimRequired,
	/// The destination-side settlement transaction has been broadcast
	DestinationBroadcast { tx_ref: TxRef },
	/// The relay gave up on this transfer
	Failed { reason: String },
}

impl RelayStatus {
	pub fn is_failed(&self) -> bool {
		matches!(self, RelayStatus::Failed { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_relay_status_wire_format() {
		let status = RelayStatus::DestinationBroadcast {
			tx_ref: TxRef::new("0xA578"),
		};
		let json = serde_json::to_value(&status).unwrap();
		assert_eq!(json["status"], "destination_broadcast");
		assert_eq!(json["tx_ref"], "0xa578");

		let pending: RelayStatus = serde_json::from_str(r#"{"status":"pending"}"#).unwrap();
		assert_eq!(pending, RelayStatus::Pending);
		assert!(RelayStatus::Failed {
			reason: "expired".to_string()
		}
		.is_failed());
	}
}
