//! Route quote domain model and ranking policy

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod errors;

pub use errors::{RouteError, RouteValidationError};

use crate::models::{Amount, Chain, Token};

/// Result types for route operations
pub type RouteResult<T> = Result<T, RouteError>;
pub type RouteValidationResult<T> = Result<T, RouteValidationError>;

/// How a bridge completes a transfer on the destination side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionProtocol {
	/// The bridge's relay settles on the destination without user action
	OneStep,
	/// The user must submit a claim transaction on the destination chain
	TwoStepClaim,
}

impl CompletionProtocol {
	pub fn requires_claim(&self) -> bool {
		matches!(self, CompletionProtocol::TwoStepClaim)
	}
}

/// Ranking objective for route estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteSelectionPolicy {
	/// Highest estimated output first
	#[default]
	MaxOutput,
	/// Lowest fee first
	CheapestFee,
	/// Shortest estimated settlement time first
	FastestEta,
}

impl RouteSelectionPolicy {
	/// Ordering that places the better route first
	///
	/// Equal scores fall back to bridge name so the result is deterministic.
	pub fn compare(&self, a: &RouteQuote, b: &RouteQuote) -> Ordering {
		let primary = match self {
			RouteSelectionPolicy::MaxOutput => b.estimated_output.cmp(&a.estimated_output),
			RouteSelectionPolicy::CheapestFee => a.fee.cmp(&b.fee),
			RouteSelectionPolicy::FastestEta => a.eta_seconds.cmp(&b.eta_seconds),
		};
		primary.then_with(|| a.bridge_name.cmp(&b.bridge_name))
	}

	/// Sort quotes best-first in place
	pub fn rank(&self, quotes: &mut [RouteQuote]) {
		quotes.sort_by(|a, b| self.compare(a, b));
	}
}

/// A request to move `amount` of `token` from `source_chain` to `destination_chain`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
	pub token: Token,
	pub source_chain: Chain,
	pub destination_chain: Chain,
	pub amount: Amount,
}

impl RouteRequest {
	pub fn new(token: Token, source_chain: Chain, destination_chain: Chain, amount: Amount) -> Self {
		Self {
			token,
			source_chain,
			destination_chain,
			amount,
		}
	}

	/// Check amount, chain pair and token ownership
	pub fn validate(&self) -> RouteValidationResult<()> {
		if self.amount.is_zero() {
			return Err(RouteValidationError::ZeroAmount);
		}

		if self.source_chain == self.destination_chain {
			return Err(RouteValidationError::SameChain {
				chain_id: self.source_chain.chain_id,
			});
		}

		if !self.token.belongs_to(&self.source_chain) {
			return Err(RouteValidationError::TokenChainMismatch {
				token: self.token.to_string(),
				chain_id: self.source_chain.chain_id,
			});
		}

		Ok(())
	}
}

/// A normalized quote for one bridge route
///
/// Produced fresh for each estimation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteQuote {
	pub route_id: String,
	pub bridge_name: String,
	pub token: Token,
	pub source_chain: Chain,
	pub destination_chain: Chain,
	/// Amount sent on the source chain
	pub amount: Amount,
	/// Amount expected to arrive on the destination chain
	pub estimated_output: Amount,
	pub fee: Amount,
	pub eta_seconds: u64,
	pub completion_protocol: CompletionProtocol,
	pub quoted_at: DateTime<Utc>,
	/// Set only when a quote TTL is configured
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<DateTime<Utc>>,
}

impl RouteQuote {
	pub fn is_expired(&self) -> bool {
		self.expires_at
			.map(|expires_at| expires_at <= Utc::now())
			.unwrap_or(false)
	}

	/// Whether this quote was produced for the given token and chain pair
	pub fn matches(&self, token: &Token, source_chain: &Chain, destination_chain: &Chain) -> bool {
		self.token == *token
			&& self.source_chain == *source_chain
			&& self.destination_chain == *destination_chain
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn quote(bridge: &str, output: u128, fee: u128, eta: u64) -> RouteQuote {
		let polygon = Chain::polygon("https://polygon-rpc.com");
		RouteQuote {
			route_id: format!("{}-route", bridge),
			bridge_name: bridge.to_string(),
			token: Token::new("0x2791bca1f2de4661ed88a30c99a7a9449aa84174", polygon.clone()),
			source_chain: polygon,
			destination_chain: Chain::gnosis("https://rpc.gnosischain.com"),
			amount: Amount::new(1_000_000),
			estimated_output: Amount::new(output),
			fee: Amount::new(fee),
			eta_seconds: eta,
			completion_protocol: CompletionProtocol::OneStep,
			quoted_at: Utc::now(),
			expires_at: None,
		}
	}

	fn names(quotes: &[RouteQuote]) -> Vec<&str> {
		quotes.iter().map(|q| q.bridge_name.as_str()).collect()
	}

	#[test]
	fn test_max_output_ranking() {
		let mut quotes = vec![quote("hop", 995000, 5000, 600), quote("connext", 998000, 2000, 900)];
		RouteSelectionPolicy::MaxOutput.rank(&mut quotes);
		assert_eq!(names(&quotes), vec!["connext", "hop"]);
	}

	#[test]
	fn test_cheapest_fee_ranking() {
		let mut quotes = vec![
			quote("a", 1, 30, 1),
			quote("b", 1, 10, 1),
			quote("c", 1, 20, 1),
		];
		RouteSelectionPolicy::CheapestFee.rank(&mut quotes);
		assert_eq!(names(&quotes), vec!["b", "c", "a"]);
	}

	#[test]
	fn test_fastest_eta_ranking() {
		let mut quotes = vec![quote("slow", 1, 1, 1800), quote("fast", 1, 1, 60)];
		RouteSelectionPolicy::FastestEta.rank(&mut quotes);
		assert_eq!(names(&quotes), vec!["fast", "slow"]);
	}

	#[test]
	fn test_ties_broken_by_bridge_name() {
		for policy in [
			RouteSelectionPolicy::MaxOutput,
			RouteSelectionPolicy::CheapestFee,
			RouteSelectionPolicy::FastestEta,
		] {
			let mut quotes = vec![
				quote("zeta", 100, 5, 60),
				quote("alpha", 100, 5, 60),
				quote("mu", 100, 5, 60),
			];
			policy.rank(&mut quotes);
			assert_eq!(names(&quotes), vec!["alpha", "mu", "zeta"], "{:?}", policy);
		}
	}

	#[test]
	fn test_request_validation() {
		let polygon = Chain::polygon("a");
		let gnosis = Chain::gnosis("b");
		let token = Token::new("0x2791bca1f2de4661ed88a30c99a7a9449aa84174", polygon.clone());

		let ok = RouteRequest::new(token.clone(), polygon.clone(), gnosis.clone(), Amount::new(1));
		assert!(ok.validate().is_ok());

		let zero = RouteRequest::new(token.clone(), polygon.clone(), gnosis.clone(), Amount::ZERO);
		assert_eq!(zero.validate(), Err(RouteValidationError::ZeroAmount));

		let same = RouteRequest::new(token.clone(), polygon.clone(), polygon.clone(), Amount::new(1));
		assert_eq!(
			same.validate(),
			Err(RouteValidationError::SameChain { chain_id: 137 })
		);

		let wrong_chain = RouteRequest::new(token, gnosis, polygon, Amount::new(1));
		assert!(matches!(
			wrong_chain.validate(),
			Err(RouteValidationError::TokenChainMismatch { chain_id: 100, .. })
		));
	}

	#[test]
	fn test_expiry() {
		let mut q = quote("hop", 1, 1, 1);
		assert!(!q.is_expired());
		q.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
		assert!(q.is_expired());
	}
}
