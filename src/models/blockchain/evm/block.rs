//! EVM block header as returned by `eth_getBlockByNumber(n, false)`.

use alloy::primitives::{Address, Bytes, B256, B64, U256, U64};
use serde::{Deserialize, Serialize};

/// Block header with transaction hashes only.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlockHeader {
	/// None when pending
	pub hash: Option<B256>,
	#[serde(rename = "parentHash")]
	pub parent_hash: B256,
	#[serde(rename = "sha3Uncles", default)]
	pub uncles_hash: B256,
	#[serde(default)]
	pub miner: Address,
	#[serde(rename = "stateRoot")]
	pub state_root: B256,
	#[serde(rename = "transactionsRoot")]
	pub transactions_root: B256,
	/// None when pending
	pub number: Option<U64>,
	#[serde(rename = "gasUsed")]
	pub gas_used: U256,
	#[serde(rename = "gasLimit", default)]
	pub gas_limit: U256,
	#[serde(rename = "baseFeePerGas", default, skip_serializing_if = "Option::is_none")]
	pub base_fee_per_gas: Option<U256>,
	#[serde(rename = "extraData", default)]
	pub extra_data: Bytes,
	pub timestamp: U256,
	#[serde(default)]
	pub difficulty: U256,
	#[serde(rename = "totalDifficulty", default)]
	pub total_difficulty: Option<U256>,
	#[serde(default)]
	pub uncles: Vec<B256>,
	#[serde(default)]
	pub transactions: Vec<B256>,
	pub size: Option<U256>,
	pub nonce: Option<B64>,
}

impl BlockHeader {
	pub fn number(&self) -> Option<u64> {
		self.number.map(|n| n.to())
	}

	pub fn transaction_count(&self) -> usize {
		self.transactions.len()
	}
}
