//! Canonical block.

use serde::{Deserialize, Serialize};

use super::{BigValue, CanonicalTransaction};
use crate::models::BlockChainType;

/// Chain specific header fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockExtension {
	Ethereum {
		miner: String,
		nonce: String,
		difficulty: BigValue,
		total_difficulty: Option<BigValue>,
		gas_limit: BigValue,
		gas_used: BigValue,
		base_fee_per_gas: Option<BigValue>,
		extra_data: String,
		sha3_uncles: String,
		state_root: String,
		transactions_root: String,
		uncles: Vec<String>,
	},
	Eos {
		producer: String,
		confirmed: u16,
		schedule_version: u32,
		transaction_mroot: String,
		action_mroot: String,
		producer_signature: String,
		ref_block_prefix: u32,
		chain_id: String,
	},
	Bitcoin {
		height: u64,
		confirmations: u64,
		stripped_size: u64,
		weight: u64,
		version: i32,
		merkle_root: String,
		median_time: u64,
		bits: String,
		chainwork: String,
		next_block_hash: Option<String>,
	},
}

/// Block in the chain independent schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalBlock {
	pub network: BlockChainType,
	pub network_slug: String,
	pub hash: String,
	pub header_hash: String,
	pub parent_hash: String,
	pub number: u64,
	/// Unix seconds
	pub timestamp: u64,
	pub size: u64,
	pub extension: BlockExtension,
	pub transactions: Vec<CanonicalTransaction>,
}

impl CanonicalBlock {
	/// Appends an owner transaction followed by one derived transaction per token action.
	///
	/// Derived indexes continue from the last derived transaction already in the block.
	pub fn push_transaction(&mut self, transaction: CanonicalTransaction) {
		let mut next_index = self.next_derived_index();
		let derived: Vec<CanonicalTransaction> = transaction
			.token_actions()
			.filter_map(|action| {
				let d = transaction.derive(action, next_index)?;
				next_index += 1;
				Some(d)
			})
			.collect();

		self.transactions.push(transaction);
		self.transactions.extend(derived);
	}

	fn next_derived_index(&self) -> u32 {
		self.transactions
			.iter()
			.rev()
			.find_map(|tx| tx.derived_index)
			.map(|i| i + 1)
			.unwrap_or(0)
	}

	pub fn owner_transactions(&self) -> impl Iterator<Item = &CanonicalTransaction> {
		self.transactions.iter().filter(|tx| !tx.is_derived)
	}

	pub fn derived_transactions(&self) -> impl Iterator<Item = &CanonicalTransaction> {
		self.transactions.iter().filter(|tx| tx.is_derived)
	}
}
