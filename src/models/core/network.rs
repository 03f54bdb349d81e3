use serde::{Deserialize, Serialize};

use crate::models::{BlockChainType, SecretValue};

fn default_max_concurrent_fetches() -> usize {
	8
}

/// How a watcher learns about new heads.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IngestionMode {
	/// Ask for the head every `block_time_ms`
	#[default]
	Poll,
	/// Follow head notifications from the node
	Subscribe,
}

/// Symbol and decimals of a chain's native currency.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NativeCurrency {
	pub symbol: String,
	pub precision: u8,
}

/// Delays used when retrying node calls.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
	fn default() -> Self {
		Self {
			base_delay_ms: 100,
			max_delay_ms: 5 * 60 * 1000,
		}
	}
}

/// Configuration for connecting to and watching one network.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Network {
	/// Chain family
	pub network_type: BlockChainType,

	/// Unique identifier, also used for the checkpoint file name
	pub slug: String,

	/// Human-readable name
	pub name: String,

	/// Node endpoints, highest weight tried first
	pub rpc_urls: Vec<RpcUrl>,

	/// Chain ID for EVM networks
	#[serde(default)]
	pub chain_id: Option<u64>,

	/// Chain ID for EOS networks, checked against `get_info`
	#[serde(default)]
	pub eos_chain_id: Option<String>,

	/// Average block time in milliseconds, also the poll interval
	pub block_time_ms: u64,

	/// Blocks behind the head before an EVM block counts as final
	pub confirmation_blocks: u64,

	/// Upper bound on catch-up after an outage
	#[serde(default)]
	pub max_past_blocks: Option<u64>,

	#[serde(default)]
	pub ingestion: IngestionMode,

	/// Block fetches in flight while catching up a range
	#[serde(default = "default_max_concurrent_fetches")]
	pub max_concurrent_fetches: usize,

	#[serde(default)]
	pub native_currency: Option<NativeCurrency>,

	#[serde(default)]
	pub backoff: BackoffConfig,
}

impl Network {
	/// Native currency, falling back to the family default.
	pub fn currency(&self) -> NativeCurrency {
		self.native_currency.clone().unwrap_or_else(|| match self.network_type {
			BlockChainType::EOS => NativeCurrency {
				symbol: "EOS".to_string(),
				precision: 4,
			},
			BlockChainType::Bitcoin => NativeCurrency {
				symbol: "BTC".to_string(),
				precision: 8,
			},
			BlockChainType::EVM => NativeCurrency {
				symbol: "ETH".to_string(),
				precision: 18,
			},
		})
	}
}

/// Node endpoint with a failover weight
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RpcUrl {
	/// Endpoint type, only "rpc" is supported
	pub type_: String,

	/// Endpoint URL (can be a secret value)
	pub url: SecretValue,

	/// 0-100, higher is preferred
	pub weight: u32,
}
