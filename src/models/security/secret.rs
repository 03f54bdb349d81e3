//! Secrets used in configuration files.
//!
//! Endpoint URLs, webhook keys and bearer tokens can be written inline or taken from an
//! environment variable. Both forms are zeroized on drop.

use serde::{Deserialize, Serialize};
use std::{env, fmt};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
	impl_case_insensitive_enum,
	models::security::error::{SecurityError, SecurityResult},
};

/// Secret value and where it comes from.
#[derive(Debug, Clone, Serialize, ZeroizeOnDrop)]
#[serde(tag = "type", content = "value")]
#[serde(deny_unknown_fields)]
pub enum SecretValue {
	/// Inline value
	Plain(SecretString),
	/// Name of the environment variable holding the value
	Environment(String),
}

impl_case_insensitive_enum!(SecretValue, {
	"plain" => Plain,
	"environment" => Environment,
});

impl PartialEq for SecretValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Plain(l), Self::Plain(r)) => l.as_str() == r.as_str(),
			(Self::Environment(l), Self::Environment(r)) => l == r,
			_ => false,
		}
	}
}

/// String that is wiped from memory when dropped.
#[derive(Debug, Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl SecretValue {
	/// Returns the secret itself, reading the environment for `Environment`.
	pub fn resolve(&self) -> SecurityResult<SecretString> {
		match self {
			SecretValue::Plain(secret) => Ok(secret.clone()),
			SecretValue::Environment(name) => env::var(name).map(SecretString::new).map_err(|e| {
				Box::new(SecurityError::parse_error(
					format!("Failed to get environment variable {}", name),
					Some(e.into()),
					None,
				))
			}),
		}
	}

	pub fn starts_with(&self, prefix: &str) -> bool {
		self.as_str().starts_with(prefix)
	}

	pub fn is_empty(&self) -> bool {
		self.as_str().is_empty()
	}

	/// Inline value, or the variable name for `Environment`
	pub fn as_str(&self) -> &str {
		match self {
			SecretValue::Plain(secret) => secret.as_str(),
			SecretValue::Environment(name) => name,
		}
	}
}

impl Zeroize for SecretValue {
	fn zeroize(&mut self) {
		match self {
			SecretValue::Plain(secret) => secret.zeroize(),
			SecretValue::Environment(name) => name.zeroize(),
		}
	}
}

impl SecretString {
	pub fn new(value: String) -> Self {
		Self(value)
	}

	/// Exposes the secret. Use the reference immediately and do not store it.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl AsRef<str> for SecretString {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}

impl fmt::Display for SecretValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl AsRef<str> for SecretValue {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
