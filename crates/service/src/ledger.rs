//! Process-wide record of tracked transfers and their claims

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use movr_types::{TransferHandle, TransferKey, TxRef};
use tracing::debug;

/// Claim progress of a two-step transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimEntry {
	/// A claim is being built, signed or submitted
	Reserved,
	/// The claim transaction was submitted
	Submitted(TxRef),
}

/// Outcome of a claim reservation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimReservation {
	Reserved,
	/// A claim is already in flight or submitted
	Taken(Option<TxRef>),
}

/// Shared by the executor and all watchers.
///
/// Enforces a single claim per transfer: reservation is atomic per key.
/// A transfer is forgotten once the last running watch session over it ends with the
/// transfer completed. Transfers that are never watched to completion stay
/// until [`TransferLedger::forget`] is called.
#[derive(Debug, Default)]
pub struct TransferLedger {
	handles: DashMap<TransferKey, TransferHandle>,
	claims: DashMap<TransferKey, ClaimEntry>,
	sessions: DashMap<TransferKey, usize>,
}

impl TransferLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record a handle; an existing record for the same key is kept
	pub fn track(&self, handle: TransferHandle) -> TransferHandle {
		let key = handle.key();
		match self.handles.entry(key) {
			Entry::Occupied(existing) => existing.get().clone(),
			Entry::Vacant(slot) => {
				debug!(transfer = %slot.key(), bridge = %handle.bridge_name, "Tracking transfer");
				slot.insert(handle.clone());
				handle
			},
		}
	}

	pub fn handle(&self, key: &TransferKey) -> Option<TransferHandle> {
		self.handles.get(key).map(|entry| entry.value().clone())
	}

	pub fn reserve_claim(&self, key: &TransferKey) -> ClaimReservation {
		match self.claims.entry(key.clone()) {
			Entry::Occupied(existing) => match existing.get() {
				ClaimEntry::Reserved => ClaimReservation::Taken(None),
				ClaimEntry::Submitted(tx_ref) => ClaimReservation::Taken(Some(tx_ref.clone())),
			},
			Entry::Vacant(slot) => {
				slot.insert(ClaimEntry::Reserved);
				ClaimReservation::Reserved
			},
		}
	}

	pub fn record_claim(&self, key: &TransferKey, claim_tx: TxRef) {
		debug!(transfer = %key, claim_tx = %claim_tx, "Recorded claim");
		self.claims
			.insert(key.clone(), ClaimEntry::Submitted(claim_tx));
	}

	/// Drop an unfinished reservation so the claim can be retried
	pub fn release_claim(&self, key: &TransferKey) {
		self.claims
			.remove_if(key, |_, entry| *entry == ClaimEntry::Reserved);
	}

	/// Submitted claim transaction, if any
	pub fn claim_ref(&self, key: &TransferKey) -> Option<TxRef> {
		self.claims.get(key).and_then(|entry| match entry.value() {
			ClaimEntry::Submitted(tx_ref) => Some(tx_ref.clone()),
			ClaimEntry::Reserved => None,
		})
	}

	/// Drop the handle and claim record of a transfer
	pub fn forget(&self, key: &TransferKey) -> Option<TransferHandle> {
		self.claims.remove(key);
		let removed = self.handles.remove(key).map(|(_, handle)| handle);
		if removed.is_some() {
			debug!(transfer = %key, "Forgot transfer");
		}
		removed
	}

	/// Count a watch session over a transfer
	pub fn open_session(&self, key: &TransferKey) {
		*self.sessions.entry(key.clone()).or_insert(0) += 1;
	}

	/// End a watch session; the last one to end over a completed transfer
	/// forgets it
	pub fn close_session(&self, key: &TransferKey, completed: bool) {
		if let Entry::Occupied(mut open) = self.sessions.entry(key.clone()) {
			let remaining = open.get().saturating_sub(1);
			if remaining > 0 {
				*open.get_mut() = remaining;
				return;
			}
			// The entry lock is held so no session can open in between
			if completed {
				self.forget(key);
			}
			open.remove();
		}
	}

	pub fn active_sessions(&self, key: &TransferKey) -> usize {
		self.sessions.get(key).map(|count| *count).unwrap_or(0)
	}

	pub fn len(&self) -> usize {
		self.handles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.handles.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use movr_types::{Chain, CompletionProtocol, Token};
	use std::sync::Arc;

	fn handle(source_tx: &str) -> TransferHandle {
		let polygon = Chain::polygon("http://polygon");
		TransferHandle {
			source_tx: TxRef::new(source_tx),
			token: Token::native(polygon.clone()),
			source_chain: polygon,
			destination_chain: Chain::gnosis("http://gnosis"),
			bridge_name: "hop".to_string(),
			completion_protocol: CompletionProtocol::TwoStepClaim,
		}
	}

	#[test]
	fn test_track_keeps_first_record() {
		let ledger = TransferLedger::new();
		let first = handle("0xAA");
		ledger.track(first.clone());

		let mut second = handle("0xaa");
		second.bridge_name = "connext".to_string();
		let kept = ledger.track(second);

		assert_eq!(kept.bridge_name, "hop");
		assert_eq!(ledger.len(), 1);
		assert_eq!(ledger.handle(&first.key()), Some(first));
	}

	#[test]
	fn test_claim_reservation_lifecycle() {
		let ledger = TransferLedger::new();
		let key = handle("0x01").key();

		assert_eq!(ledger.reserve_claim(&key), ClaimReservation::Reserved);
		assert_eq!(ledger.reserve_claim(&key), ClaimReservation::Taken(None));

		ledger.release_claim(&key);
		assert_eq!(ledger.reserve_claim(&key), ClaimReservation::Reserved);

		ledger.record_claim(&key, TxRef::new("0xc1"));
		assert_eq!(ledger.claim_ref(&key), Some(TxRef::new("0xc1")));
		ledger.release_claim(&key);
		assert_eq!(
			ledger.reserve_claim(&key),
			ClaimReservation::Taken(Some(TxRef::new("0xc1")))
		);
	}

	#[test]
	fn test_forget_drops_handle_and_claim() {
		let ledger = TransferLedger::new();
		let tracked = handle("0x03");
		let key = tracked.key();
		ledger.track(tracked.clone());
		ledger.record_claim(&key, TxRef::new("0xc3"));

		assert_eq!(ledger.forget(&key), Some(tracked));
		assert!(ledger.is_empty());
		assert_eq!(ledger.claim_ref(&key), None);
		assert_eq!(ledger.reserve_claim(&key), ClaimReservation::Reserved);
		assert_eq!(ledger.forget(&handle("0x04").key()), None);
	}

	#[test]
	fn test_last_completed_session_forgets_transfer() {
		let ledger = TransferLedger::new();
		let tracked = handle("0x05");
		let key = tracked.key();
		ledger.track(tracked);

		ledger.open_session(&key);
		ledger.open_session(&key);
		ledger.close_session(&key, true);
		assert_eq!(ledger.active_sessions(&key), 1);
		assert_eq!(ledger.len(), 1);

		ledger.close_session(&key, true);
		assert_eq!(ledger.active_sessions(&key), 0);
		assert!(ledger.is_empty());
	}

	#[test]
	fn test_unfinished_sessions_keep_transfer() {
		let ledger = TransferLedger::new();
		let tracked = handle("0x06");
		let key = tracked.key();
		ledger.track(tracked);

		ledger.open_session(&key);
		ledger.close_session(&key, false);
		assert_eq!(ledger.active_sessions(&key), 0);
		assert_eq!(ledger.len(), 1);

		// Closing without a matching open is a no-op
		ledger.close_session(&key, true);
		assert_eq!(ledger.len(), 1);
	}

	#[test]
	fn test_concurrent_reservation_has_single_winner() {
		let ledger = Arc::new(TransferLedger::new());
		let key = handle("0x02").key();

		let winners: usize = (0..16)
			.map(|_| {
				let ledger = ledger.clone();
				let key = key.clone();
				std::thread::spawn(move || ledger.reserve_claim(&key) == ClaimReservation::Reserved)
			})
			.collect::<Vec<_>>()
			.into_iter()
			.map(|t| t.join().unwrap() as usize)
			.sum();

		assert_eq!(winners, 1);
	}
}
