//! EOS transaction receipts embedded in `get_block`.

use serde::{Deserialize, Serialize};

use crate::models::EosTransactionStatus;

/// Receipt status, sent as a name by most nodes and as a code by some.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ReceiptStatus {
	Code(u8),
	Name(String),
}

impl ReceiptStatus {
	pub fn status(&self) -> EosTransactionStatus {
		match self {
			Self::Code(code) => EosTransactionStatus::from_code(*code),
			Self::Name(name) => EosTransactionStatus::from_name(name),
		}
	}
}

impl Default for ReceiptStatus {
	fn default() -> Self {
		Self::Code(u8::MAX)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct TransactionReceipt {
	#[serde(default)]
	pub status: ReceiptStatus,
	#[serde(default)]
	pub cpu_usage_us: u64,
	#[serde(default)]
	pub net_usage_words: u64,
	pub trx: ReceiptTrx,
}

/// Deferred transactions only carry their id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ReceiptTrx {
	Id(String),
	Packed(Box<PackedTransaction>),
}

impl Default for ReceiptTrx {
	fn default() -> Self {
		Self::Id(String::new())
	}
}

impl ReceiptTrx {
	pub fn id(&self) -> &str {
		match self {
			Self::Id(id) => id,
			Self::Packed(packed) => &packed.id,
		}
	}
}

/// Compression of `packed_trx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
	#[default]
	None,
	Zlib,
	Unsupported,
}

impl<'de> Deserialize<'de> for Compression {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = serde_json::Value::deserialize(deserializer)?;
		let parsed = match serde_json::from_value::<RawCompression>(raw) {
			Ok(RawCompression::Code(0)) => Self::None,
			Ok(RawCompression::Code(1)) => Self::Zlib,
			Ok(RawCompression::Name(name)) => match name.to_lowercase().as_str() {
				"none" | "" => Self::None,
				"zlib" => Self::Zlib,
				_ => Self::Unsupported,
			},
			_ => Self::Unsupported,
		};
		Ok(parsed)
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCompression {
	Code(u8),
	Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct PackedTransaction {
	pub id: String,
	#[serde(default)]
	pub signatures: Vec<String>,
	#[serde(default)]
	pub compression: Compression,
	#[serde(default)]
	pub packed_trx: String,
	/// Present when the node decoded the transaction against the contract ABI
	#[serde(default)]
	pub transaction: Option<UnpackedTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct UnpackedTransaction {
	pub expiration: String,
	pub ref_block_num: u16,
	pub ref_block_prefix: u32,
	#[serde(default)]
	pub max_net_usage_words: u32,
	#[serde(default)]
	pub max_cpu_usage_ms: u8,
	#[serde(default)]
	pub delay_sec: u32,
	#[serde(default)]
	pub context_free_actions: Vec<Action>,
	#[serde(default)]
	pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct PermissionLevel {
	pub actor: String,
	pub permission: String,
}

impl std::fmt::Display for PermissionLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}@{}", self.actor, self.permission)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct Action {
	pub account: String,
	pub name: String,
	#[serde(default)]
	pub authorization: Vec<PermissionLevel>,
	/// ABI decoded object, or the raw hex string when the node has no ABI
	#[serde(default)]
	pub data: serde_json::Value,
	#[serde(default)]
	pub hex_data: Option<String>,
}

impl Action {
	/// Hex payload, preferring `hex_data` over a string `data`.
	pub fn hex_payload(&self) -> Option<&str> {
		self.hex_data
			.as_deref()
			.or_else(|| self.data.as_str())
			.filter(|s| !s.is_empty())
	}
}
