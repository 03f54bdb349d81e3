//! Canonical transaction.

use serde::{Deserialize, Serialize};

use super::{Action, BigValue};

/// EOS receipt status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EosTransactionStatus {
	Executed,
	SoftFail,
	HardFail,
	Delayed,
	Expired,
	Unknown,
}

impl EosTransactionStatus {
	pub fn from_code(code: u8) -> Self {
		match code {
			0 => Self::Executed,
			1 => Self::SoftFail,
			2 => Self::HardFail,
			3 => Self::Delayed,
			4 => Self::Expired,
			_ => Self::Unknown,
		}
	}

	/// Maps the textual form returned by `get_block`.
	pub fn from_name(name: &str) -> Self {
		match name {
			"executed" => Self::Executed,
			"soft_fail" => Self::SoftFail,
			"hard_fail" => Self::HardFail,
			"delayed" => Self::Delayed,
			"expired" => Self::Expired,
			_ => Self::Unknown,
		}
	}
}

/// Chain specific transaction fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionExtension {
	Ethereum {
		gas: BigValue,
		gas_price: BigValue,
		input: String,
	},
	Eos {
		status: EosTransactionStatus,
		cpu_usage_us: u64,
		net_usage_words: u64,
		expiration: String,
		signatures: Vec<String>,
	},
	#[default]
	None,
}

/// Transaction in the chain independent schema.
///
/// Owner transactions carry the actions they were built from. For every token action a
/// derived transaction is appended to the block right after its owner; it carries the
/// single movement as its flattened view, no actions, and the index of the action it came
/// from in `source_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
	pub block_hash: String,
	pub block_number: u64,
	pub hash: String,
	pub nonce: u64,
	pub transaction_index: u32,
	pub from: String,
	/// Empty for contract creation
	pub to: String,
	pub value: BigValue,
	pub symbol: String,
	pub precision: u8,
	pub actions: Vec<Action>,
	pub is_derived: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub derived_index: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_action: Option<u32>,
	#[serde(default)]
	pub extension: TransactionExtension,
}

impl CanonicalTransaction {
	/// Actions that move tokens, in action order.
	pub fn token_actions(&self) -> impl Iterator<Item = &Action> {
		self.actions.iter().filter(|a| a.kind.is_token_movement())
	}

	/// Builds the flattened transaction for one of this transaction's actions.
	///
	/// Returns `None` when the action does not move tokens.
	pub fn derive(&self, action: &Action, derived_index: u32) -> Option<Self> {
		let movement = action.kind.movement()?;
		Some(Self {
			block_hash: self.block_hash.clone(),
			block_number: self.block_number,
			hash: self.hash.clone(),
			nonce: self.nonce,
			transaction_index: self.transaction_index,
			from: movement.from.clone(),
			to: movement.to.clone(),
			value: movement.value,
			symbol: movement.symbol.clone(),
			precision: movement.precision,
			actions: Vec::new(),
			is_derived: true,
			derived_index: Some(derived_index),
			source_action: Some(action.index),
			extension: TransactionExtension::None,
		})
	}

	/// Copies the movement of the only token action into the flattened view.
	///
	/// Transactions with zero or several token actions keep their current view.
	pub fn flatten_single_movement(&mut self) {
		let movement = {
			let mut token_actions = self.token_actions();
			match (token_actions.next(), token_actions.next()) {
				(Some(only), None) => only.kind.movement().cloned(),
				_ => None,
			}
		};
		let Some(movement) = movement else {
			return;
		};
		self.from = movement.from;
		self.to = movement.to;
		self.value = movement.value;
		self.symbol = movement.symbol;
		self.precision = movement.precision;
	}
}
