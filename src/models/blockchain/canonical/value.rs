//! Arbitrary precision amounts.

use alloy::primitives::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Unsigned 256-bit amount serialized as a decimal string.
///
/// Native values, gas figures and token quantities of every supported chain family fit in
/// 256 bits, so nothing is ever truncated when copying them into the canonical model.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigValue(pub U256);

impl BigValue {
	pub const ZERO: Self = Self(U256::ZERO);

	pub fn is_zero(&self) -> bool {
		self.0.is_zero()
	}

	/// Parses a `0x` prefixed hex quantity as returned by JSON-RPC nodes.
	pub fn from_hex(s: &str) -> Result<Self, String> {
		let digits = s
			.strip_prefix("0x")
			.or_else(|| s.strip_prefix("0X"))
			.unwrap_or(s);
		if digits.is_empty() {
			return Ok(Self::ZERO);
		}
		U256::from_str_radix(digits, 16)
			.map(Self)
			.map_err(|e| format!("invalid hex quantity '{}': {}", s, e))
	}
}

impl fmt::Display for BigValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for BigValue {
	type Err = String;

	/// Accepts decimal digits, or hex when prefixed with `0x`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.starts_with("0x") || s.starts_with("0X") {
			return Self::from_hex(s);
		}
		if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
			return Err(format!("invalid decimal quantity '{}'", s));
		}
		U256::from_str_radix(s, 10)
			.map(Self)
			.map_err(|e| format!("invalid decimal quantity '{}': {}", s, e))
	}
}

impl From<U256> for BigValue {
	fn from(value: U256) -> Self {
		Self(value)
	}
}

impl From<u64> for BigValue {
	fn from(value: u64) -> Self {
		Self(U256::from(value))
	}
}

impl From<u128> for BigValue {
	fn from(value: u128) -> Self {
		Self(U256::from(value))
	}
}

impl Serialize for BigValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.0.to_string())
	}
}

impl<'de> Deserialize<'de> for BigValue {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct BigValueVisitor;

		impl de::Visitor<'_> for BigValueVisitor {
			type Value = BigValue;

			fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
				f.write_str("a decimal string or an unsigned integer")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
				v.parse().map_err(E::custom)
			}

			fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
				Ok(BigValue::from(v))
			}

			fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
				u64::try_from(v)
					.map(BigValue::from)
					.map_err(|_| E::custom(format!("negative quantity {}", v)))
			}
		}

		deserializer.deserialize_any(BigValueVisitor)
	}
}
