//! Actions carried by canonical transactions.

use serde::{Deserialize, Serialize};

use super::BigValue;

/// Movement of a fungible token between two parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMovement {
	pub from: String,
	pub to: String,
	pub value: BigValue,
	pub symbol: String,
	pub precision: u8,
	#[serde(default)]
	pub memo: String,
}

/// What an action does, as far as it could be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
	Transfer(TokenMovement),
	/// Token creation or minting
	Mint(TokenMovement),
	Issue(TokenMovement),
	Unknown,
}

impl ActionKind {
	pub fn movement(&self) -> Option<&TokenMovement> {
		match self {
			Self::Transfer(m) | Self::Mint(m) | Self::Issue(m) => Some(m),
			Self::Unknown => None,
		}
	}

	pub fn is_token_movement(&self) -> bool {
		self.movement().is_some()
	}
}

/// One operation inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
	/// Position within the owning transaction
	pub index: u32,
	/// Contract address or account name
	pub account: String,
	/// Method or action name
	pub name: String,
	/// `actor@permission` entries
	#[serde(default)]
	pub authorization: Vec<String>,
	/// Hex encoded payload
	pub data: String,
	#[serde(flatten)]
	pub kind: ActionKind,
}
