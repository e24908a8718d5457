//! Polling cadence for transfer observers

use std::time::Duration;

use movr_types::TransferPhase;

use super::state::TransferState;

/// Polling configuration shared by the observers of one watcher
#[derive(Debug, Clone)]
pub struct PollingConfig {
	/// Backoff schedule in milliseconds
	pub backoff_schedule_ms: Vec<u64>,
	/// Delay cap, also used once the schedule is exhausted
	pub max_backoff_ms: u64,
	/// Consecutive failed polls tolerated per observer
	pub max_consecutive_failures: u32,
	/// Timeout for one chain or relay query
	pub request_timeout_ms: u64,
	pub source_timeout_ms: u64,
	pub relay_timeout_ms: u64,
	pub destination_timeout_ms: u64,
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			backoff_schedule_ms: vec![2_000, 4_000, 8_000, 15_000, 30_000],
			max_backoff_ms: 60_000,
			max_consecutive_failures: 10,
			request_timeout_ms: 10_000,
			source_timeout_ms: 1_800_000,
			relay_timeout_ms: 7_200_000,
			destination_timeout_ms: 3_600_000,
		}
	}
}

impl PollingConfig {
	/// Calculate the delay before the poll following `attempt`
	pub fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
		let millis = self
			.backoff_schedule_ms
			.get(attempt as usize)
			.copied()
			.unwrap_or(self.max_backoff_ms)
			.min(self.max_backoff_ms);

		Duration::from_millis(millis)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	/// Maximum time the watcher may spend in the current phase
	///
	/// `None` while no deadline applies: terminal phases, and a claim phase
	/// still waiting for someone to submit the claim.
	pub fn phase_timeout(&self, state: &TransferState) -> Option<Duration> {
		let millis = match state.phase {
			TransferPhase::Started
			| TransferPhase::DestinationTxConfirmed
			| TransferPhase::Failed => return None,
			TransferPhase::SourceTxPending => self.source_timeout_ms,
			TransferPhase::SourceTxConfirmed | TransferPhase::ClaimConfirmed => {
				self.relay_timeout_ms
			},
			TransferPhase::ClaimPending => {
				state.claim_tx.as_ref()?;
				self.destination_timeout_ms
			},
			TransferPhase::DestinationTxPending => self.destination_timeout_ms,
		};
		Some(Duration::from_millis(millis))
	}
}

/// What an observer does after one poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
	/// Poll again after the returned delay
	Continue(Duration),
	/// Too many consecutive failures; report and stop
	Exhausted { attempts: u32, last_error: String },
}

/// Attempt and failure bookkeeping for one observer
#[derive(Debug, Default)]
pub struct PollTracker {
	attempts: u32,
	consecutive_failures: u32,
	phase: Option<TransferPhase>,
}

impl PollTracker {
	/// Restart the backoff schedule whenever the observed phase changes
	pub fn observe_phase(&mut self, phase: TransferPhase) {
		if self.phase != Some(phase) {
			self.phase = Some(phase);
			self.attempts = 0;
			self.consecutive_failures = 0;
		}
	}

	pub fn succeeded(&mut self, config: &PollingConfig) -> PollOutcome {
		self.consecutive_failures = 0;
		self.next(config)
	}

	pub fn failed(&mut self, config: &PollingConfig, error: impl ToString) -> PollOutcome {
		self.consecutive_failures += 1;
		if self.consecutive_failures > config.max_consecutive_failures {
			return PollOutcome::Exhausted {
				attempts: self.consecutive_failures,
				last_error: error.to_string(),
			};
		}
		self.next(config)
	}

	fn next(&mut self, config: &PollingConfig) -> PollOutcome {
		let delay = config.calculate_backoff_delay(self.attempts);
		self.attempts = self.attempts.saturating_add(1);
		PollOutcome::Continue(delay)
	}
}
