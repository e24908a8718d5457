//! Token amount model in the token's smallest unit

use std::fmt;
use std::str::FromStr;

/// Integer token amount expressed in the token's smallest unit
///
/// No decimal scaling is applied: 1 USDC (6 decimals) is `Amount::new(1_000_000)`.
/// Serialized as a decimal string to survive JSON consumers that use doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(pub u128);

impl Amount {
	pub const ZERO: Amount = Amount(0);

	pub fn new(value: u128) -> Self {
		Self(value)
	}

	/// Raw value in smallest units
	pub fn value(&self) -> u128 {
		self.0
	}

	pub fn is_zero(&self) -> bool {
		self.0 == 0
	}

	pub fn checked_sub(self, other: Amount) -> Option<Amount> {
		self.0.checked_sub(other.0).map(Amount)
	}

	pub fn saturating_sub(self, other: Amount) -> Amount {
		Amount(self.0.saturating_sub(other.0))
	}
}

impl fmt::Display for Amount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for Amount {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Err("amount cannot be empty".to_string());
		}
		if !s.chars().all(|c| c.is_ascii_digit()) {
			return Err(format!("amount '{}' must contain only digits", s));
		}
		s.parse::<u128>()
			.map(Amount)
			.map_err(|e| format!("amount '{}' out of range: {}", s, e))
	}
}

impl From<u128> for Amount {
	fn from(value: u128) -> Self {
		Self(value)
	}
}

impl From<u64> for Amount {
	fn from(value: u64) -> Self {
		Self(value as u128)
	}
}

impl serde::Serialize for Amount {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.0.to_string())
	}
}

impl<'de> serde::Deserialize<'de> for Amount {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;
		value.parse().map_err(serde::de::Error::custom)
	}
}
