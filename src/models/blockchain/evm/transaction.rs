//! EVM transaction as returned by `eth_getTransactionByBlockNumberAndIndex`.

use alloy::primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Transaction {
	pub hash: B256,
	pub nonce: U256,
	#[serde(rename = "blockHash")]
	pub block_hash: Option<B256>,
	#[serde(rename = "blockNumber")]
	pub block_number: Option<U64>,
	#[serde(rename = "transactionIndex")]
	pub transaction_index: Option<U64>,
	#[serde(default)]
	pub from: Option<Address>,
	/// None for contract creation
	pub to: Option<Address>,
	pub value: U256,
	/// Absent on some EIP-1559 responses
	#[serde(rename = "gasPrice", default)]
	pub gas_price: Option<U256>,
	#[serde(rename = "maxFeePerGas", default, skip_serializing_if = "Option::is_none")]
	pub max_fee_per_gas: Option<U256>,
	pub gas: U256,
	#[serde(default)]
	pub input: Bytes,
}

impl Transaction {
	pub fn index(&self) -> Option<u64> {
		self.transaction_index.map(|i| i.to())
	}

	/// Price actually quoted by the sender, preferring the legacy field.
	pub fn effective_gas_price(&self) -> U256 {
		self.gas_price
			.or(self.max_fee_per_gas)
			.unwrap_or(U256::ZERO)
	}

	/// First four bytes of the call data, if present.
	pub fn selector(&self) -> Option<[u8; 4]> {
		self.input.get(..4).and_then(|s| s.try_into().ok())
	}
}
