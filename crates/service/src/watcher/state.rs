//! Transfer lifecycle state machine
//!
//! Pure and synchronous: observers report what they saw, [`TransferState::apply`]
//! decides whether that moves the transfer forward. Repeated observations of
//! the same fact never produce a second transition.

use chrono::{DateTime, Utc};
use movr_types::{
	CompletionProtocol, FailureCause, RelayStatus, TransferLeg, TransferPhase, TxRef,
};

/// Chain status of a watched transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
	/// Not yet included in a block
	Pending,
	Included { confirmations: u64, success: bool },
}

/// Which observer loop produced an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverKind {
	Source,
	Relay,
	Destination,
}

impl std::fmt::Display for ObserverKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ObserverKind::Source => f.write_str("source"),
			ObserverKind::Relay => f.write_str("relay"),
			ObserverKind::Destination => f.write_str("destination"),
		}
	}
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
	SourceTx(TxStatus),
	Relay(RelayStatus),
	/// A claim transaction for this transfer was recorded in the ledger
	ClaimSubmitted(TxRef),
	ClaimTx(TxStatus),
	DestinationTx(TxStatus),
	PollingExhausted {
		observer: ObserverKind,
		attempts: u32,
		last_error: String,
	},
	PhaseTimedOut,
}

/// A phase change produced by one observation
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
	pub from: TransferPhase,
	pub to: TransferPhase,
	/// Claim or destination transaction the new phase refers to
	pub tx_ref: Option<TxRef>,
	pub confirmations: Option<u64>,
	pub cause: Option<FailureCause>,
}

/// Effect of applying an observation
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
	Ignored,
	/// State data changed without a phase change
	Updated,
	Transitioned(Transition),
}

/// Snapshot of one watched transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferState {
	pub phase: TransferPhase,
	pub source_tx: TxRef,
	pub source_confirmations: u64,
	pub claim_tx: Option<TxRef>,
	pub claim_confirmations: u64,
	pub destination_tx: Option<TxRef>,
	pub destination_confirmations: u64,
	pub failure: Option<FailureCause>,
	pub updated_at: DateTime<Utc>,
	protocol: CompletionProtocol,
	source_min_confirmations: u64,
	destination_min_confirmations: u64,
}

impl TransferState {
	pub fn new(
		source_tx: TxRef,
		protocol: CompletionProtocol,
		source_min_confirmations: u64,
		destination_min_confirmations: u64,
	) -> Self {
		Self {
			phase: TransferPhase::Started,
			source_tx,
			source_confirmations: 0,
			claim_tx: None,
			claim_confirmations: 0,
			destination_tx: None,
			destination_confirmations: 0,
			failure: None,
			updated_at: Utc::now(),
			protocol,
			source_min_confirmations: source_min_confirmations.max(1),
			destination_min_confirmations: destination_min_confirmations.max(1),
		}
	}

	pub fn protocol(&self) -> CompletionProtocol {
		self.protocol
	}

	pub fn is_terminal(&self) -> bool {
		self.phase.is_terminal()
	}

	/// `Started → SourceTxPending`
	pub fn begin(&mut self) -> Option<Transition> {
		if self.phase != TransferPhase::Started {
			return None;
		}
		Some(self.advance(TransferPhase::SourceTxPending, None, None))
	}

	pub fn apply(&mut self, observation: Observation) -> Applied {
		if self.phase.is_terminal() || self.phase == TransferPhase::Started {
			return Applied::Ignored;
		}

		match observation {
			Observation::PollingExhausted {
				observer,
				attempts,
				last_error,
			} => self.fail(FailureCause::PollingTimeout {
				phase: self.phase,
				detail: format!(
					"{} observer failed {} consecutive polls: {}",
					observer, attempts, last_error
				),
			}),
			Observation::PhaseTimedOut => self.fail(FailureCause::PollingTimeout {
				phase: self.phase,
				detail: "phase exceeded its maximum duration".to_string(),
			}),
			Observation::Relay(RelayStatus::Failed { reason }) => {
				self.fail(FailureCause::RelayFailed { reason })
			},
			Observation::ClaimSubmitted(tx_ref) => {
				if self.claim_tx.is_some() || !self.protocol.requires_claim() {
					return Applied::Ignored;
				}
				self.claim_tx = Some(tx_ref);
				self.updated_at = Utc::now();
				Applied::Updated
			},
			observation => self.progress(observation),
		}
	}

	fn progress(&mut self, observation: Observation) -> Applied {
		match (self.phase, observation) {
			(TransferPhase::SourceTxPending, Observation::SourceTx(status)) => match status {
				TxStatus::Included { success: false, .. } => {
					self.fail(FailureCause::TransactionReverted {
						leg: TransferLeg::Source,
						tx_ref: self.source_tx.clone(),
					})
				},
				TxStatus::Included { confirmations, .. } => {
					if confirmations <= self.source_confirmations {
						return Applied::Ignored;
					}
					self.source_confirmations = confirmations;
					if confirmations < self.source_min_confirmations {
						self.updated_at = Utc::now();
						return Applied::Updated;
					}
					Applied::Transitioned(self.advance(
						TransferPhase::SourceTxConfirmed,
						None,
						Some(confirmations),
					))
				},
				TxStatus::Pending => Applied::Ignored,
			},

			(TransferPhase::SourceTxConfirmed, Observation::Relay(RelayStatus::ClaimRequired))
				if self.protocol.requires_claim() =>
			{
				Applied::Transitioned(self.advance(TransferPhase::ClaimPending, None, None))
			},

			(
				TransferPhase::SourceTxConfirmed,
				Observation::Relay(RelayStatus::DestinationBroadcast { tx_ref }),
			) if !self.protocol.requires_claim() => self.destination_broadcast(tx_ref),

			(TransferPhase::ClaimPending, Observation::ClaimTx(status)) => {
				let Some(claim_tx) = self.claim_tx.clone() else {
					return Applied::Ignored;
				};
				match status {
					TxStatus::Included { success: false, .. } => {
						self.fail(FailureCause::TransactionReverted {
							leg: TransferLeg::Claim,
							tx_ref: claim_tx,
						})
					},
					TxStatus::Included { confirmations, .. } => {
						if confirmations <= self.claim_confirmations {
							return Applied::Ignored;
						}
						self.claim_confirmations = confirmations;
						if confirmations < self.destination_min_confirmations {
							self.updated_at = Utc::now();
							return Applied::Updated;
						}
						Applied::Transitioned(self.advance(
							TransferPhase::ClaimConfirmed,
							Some(claim_tx),
							Some(confirmations),
						))
					},
					TxStatus::Pending => Applied::Ignored,
				}
			},

			(
				TransferPhase::ClaimConfirmed,
				Observation::Relay(RelayStatus::DestinationBroadcast { tx_ref }),
			) => self.destination_broadcast(tx_ref),

			(TransferPhase::DestinationTxPending, Observation::DestinationTx(status)) => {
				let Some(destination_tx) = self.destination_tx.clone() else {
					return Applied::Ignored;
				};
				match status {
					TxStatus::Included { success: false, .. } => {
						self.fail(FailureCause::TransactionReverted {
							leg: TransferLeg::Destination,
							tx_ref: destination_tx,
						})
					},
					TxStatus::Included { confirmations, .. } => {
						if confirmations <= self.destination_confirmations {
							return Applied::Ignored;
						}
						self.destination_confirmations = confirmations;
						if confirmations < self.destination_min_confirmations {
							self.updated_at = Utc::now();
							return Applied::Updated;
						}
						Applied::Transitioned(self.advance(
							TransferPhase::DestinationTxConfirmed,
							Some(destination_tx),
							Some(confirmations),
						))
					},
					TxStatus::Pending => Applied::Ignored,
				}
			},

			_ => Applied::Ignored,
		}
	}

	fn destination_broadcast(&mut self, tx_ref: TxRef) -> Applied {
		self.destination_tx = Some(tx_ref.clone());
		Applied::Transitioned(self.advance(
			TransferPhase::DestinationTxPending,
			Some(tx_ref),
			None,
		))
	}

	fn fail(&mut self, cause: FailureCause) -> Applied {
		let tx_ref = match &cause {
			FailureCause::TransactionReverted { tx_ref, .. } => Some(tx_ref.clone()),
			_ => None,
		};
		self.failure = Some(cause.clone());
		let mut transition = self.advance(TransferPhase::Failed, tx_ref, None);
		transition.cause = Some(cause);
		Applied::Transitioned(transition)
	}

	fn advance(
		&mut self,
		to: TransferPhase,
		tx_ref: Option<TxRef>,
		confirmations: Option<u64>,
	) -> Transition {
		debug_assert!(self.phase.can_advance_to(to));
		let from = self.phase;
		self.phase = to;
		self.updated_at = Utc::now();
		Transition {
			from,
			to,
			tx_ref,
			confirmations,
			cause: None,
		}
	}
}
