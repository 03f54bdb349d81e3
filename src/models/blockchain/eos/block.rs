//! EOS `get_info` and `get_block` payloads.

use serde::{Deserialize, Serialize};

use super::EOSTransactionReceipt;

/// Response of `/v1/chain/get_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChainInfo {
	pub chain_id: String,
	pub head_block_num: u64,
	pub last_irreversible_block_num: u64,
	#[serde(default)]
	pub head_block_id: String,
	#[serde(default)]
	pub last_irreversible_block_id: String,
	#[serde(default)]
	pub head_block_producer: String,
}

/// Response of `/v1/chain/get_block`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Block {
	/// `2018-08-23T17:39:23.500`, UTC without offset
	pub timestamp: String,
	pub producer: String,
	#[serde(default)]
	pub confirmed: u16,
	pub previous: String,
	#[serde(default)]
	pub transaction_mroot: String,
	#[serde(default)]
	pub action_mroot: String,
	#[serde(default)]
	pub schedule_version: u32,
	#[serde(default)]
	pub producer_signature: String,
	pub id: String,
	pub block_num: u64,
	#[serde(default)]
	pub ref_block_prefix: u32,
	#[serde(default)]
	pub transactions: Vec<EOSTransactionReceipt>,
}
