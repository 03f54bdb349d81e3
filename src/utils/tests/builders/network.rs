//! Test helper utilities for Network configuration
//!
//! - `NetworkBuilder`: Builder for creating test Network instances

use crate::models::{
	BackoffConfig, BlockChainType, IngestionMode, NativeCurrency, Network, RpcUrl, SecretString,
	SecretValue,
};

/// Chain id of the EOS mainnet
pub const EOS_MAINNET_CHAIN_ID: &str =
	"aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";

/// Builder for creating test Network instances
pub struct NetworkBuilder {
	name: String,
	slug: String,
	network_type: BlockChainType,
	chain_id: Option<u64>,
	eos_chain_id: Option<String>,
	rpc_urls: Vec<RpcUrl>,
	block_time_ms: u64,
	confirmation_blocks: u64,
	max_past_blocks: Option<u64>,
	ingestion: IngestionMode,
	max_concurrent_fetches: usize,
	native_currency: Option<NativeCurrency>,
	backoff: BackoffConfig,
}

impl Default for NetworkBuilder {
	fn default() -> Self {
		Self {
			name: "Test Network".to_string(),
			slug: "test_network".to_string(),
			network_type: BlockChainType::EVM,
			chain_id: Some(1),
			eos_chain_id: None,
			rpc_urls: vec![rpc("https://test.network", 100)],
			block_time_ms: 1000,
			confirmation_blocks: 1,
			max_past_blocks: Some(10),
			ingestion: IngestionMode::Poll,
			max_concurrent_fetches: 8,
			native_currency: None,
			backoff: BackoffConfig::default(),
		}
	}
}

fn rpc(url: &str, weight: u32) -> RpcUrl {
	RpcUrl {
		type_: "rpc".to_string(),
		url: SecretValue::Plain(SecretString::new(url.to_string())),
		weight,
	}
}

impl NetworkBuilder {
	/// Valid EVM network with chain id 1
	pub fn new() -> Self {
		Self::default()
	}

	/// Valid EOS mainnet network
	pub fn eos() -> Self {
		Self {
			name: "EOS Mainnet".to_string(),
			slug: "eos_mainnet".to_string(),
			network_type: BlockChainType::EOS,
			chain_id: None,
			eos_chain_id: Some(EOS_MAINNET_CHAIN_ID.to_string()),
			block_time_ms: 500,
			confirmation_blocks: 0,
			max_past_blocks: None,
			..Self::default()
		}
	}

	pub fn name(mut self, name: &str) -> Self {
		self.name = name.to_string();
		self
	}

	pub fn slug(mut self, slug: &str) -> Self {
		self.slug = slug.to_string();
		self
	}

	pub fn network_type(mut self, network_type: BlockChainType) -> Self {
		self.network_type = network_type;
		self
	}

	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = Some(chain_id);
		self
	}

	pub fn eos_chain_id(mut self, chain_id: &str) -> Self {
		self.eos_chain_id = Some(chain_id.to_string());
		self
	}

	/// Replaces every endpoint with `url`
	pub fn rpc_url(mut self, url: &str) -> Self {
		self.rpc_urls = vec![rpc(url, 100)];
		self
	}

	pub fn add_rpc_url(mut self, url: &str, type_: &str, weight: u32) -> Self {
		let mut endpoint = rpc(url, weight);
		endpoint.type_ = type_.to_string();
		self.rpc_urls.push(endpoint);
		self
	}

	pub fn add_secret_rpc_url(mut self, url: SecretValue, weight: u32) -> Self {
		self.rpc_urls.push(RpcUrl {
			type_: "rpc".to_string(),
			url,
			weight,
		});
		self
	}

	pub fn clear_rpc_urls(mut self) -> Self {
		self.rpc_urls.clear();
		self
	}

	pub fn block_time_ms(mut self, block_time: u64) -> Self {
		self.block_time_ms = block_time;
		self
	}

	pub fn confirmation_blocks(mut self, blocks: u64) -> Self {
		self.confirmation_blocks = blocks;
		self
	}

	pub fn max_past_blocks(mut self, blocks: u64) -> Self {
		self.max_past_blocks = Some(blocks);
		self
	}

	pub fn ingestion(mut self, ingestion: IngestionMode) -> Self {
		self.ingestion = ingestion;
		self
	}

	pub fn max_concurrent_fetches(mut self, fetches: usize) -> Self {
		self.max_concurrent_fetches = fetches;
		self
	}

	pub fn native_currency(mut self, symbol: &str, precision: u8) -> Self {
		self.native_currency = Some(NativeCurrency {
			symbol: symbol.to_string(),
			precision,
		});
		self
	}

	pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
		self.backoff = backoff;
		self
	}

	pub fn build(self) -> Network {
		Network {
			network_type: self.network_type,
			slug: self.slug,
			name: self.name,
			rpc_urls: self.rpc_urls,
			chain_id: self.chain_id,
			eos_chain_id: self.eos_chain_id,
			block_time_ms: self.block_time_ms,
			confirmation_blocks: self.confirmation_blocks,
			max_past_blocks: self.max_past_blocks,
			ingestion: self.ingestion,
			max_concurrent_fetches: self.max_concurrent_fetches,
			native_currency: self.native_currency,
			backoff: self.backoff,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_network() {
		let network = NetworkBuilder::new().build();

		assert_eq!(network.name, "Test Network");
		assert_eq!(network.slug, "test_network");
		assert_eq!(network.network_type, BlockChainType::EVM);
		assert_eq!(network.chain_id, Some(1));
		assert_eq!(network.block_time_ms, 1000);
		assert_eq!(network.confirmation_blocks, 1);
		assert_eq!(network.max_past_blocks, Some(10));
		assert_eq!(network.ingestion, IngestionMode::Poll);

		assert_eq!(network.rpc_urls.len(), 1);
		assert_eq!(network.rpc_urls[0].url.as_str(), "https://test.network");
		assert_eq!(network.rpc_urls[0].type_, "rpc");
		assert_eq!(network.rpc_urls[0].weight, 100);
	}

	#[test]
	fn test_eos_network() {
		let network = NetworkBuilder::eos().build();

		assert_eq!(network.network_type, BlockChainType::EOS);
		assert_eq!(network.chain_id, None);
		assert_eq!(network.eos_chain_id.as_deref(), Some(EOS_MAINNET_CHAIN_ID));
		assert_eq!(network.currency().symbol, "EOS");
	}

	#[test]
	fn test_rpc_url_methods() {
		let network = NetworkBuilder::new()
			.clear_rpc_urls()
			.add_rpc_url("https://a.node", "rpc", 80)
			.add_secret_rpc_url(SecretValue::Environment("NODE_URL".to_string()), 20)
			.build();

		assert_eq!(network.rpc_urls.len(), 2);
		assert_eq!(network.rpc_urls[0].weight, 80);
		assert_eq!(network.rpc_urls[1].url.as_str(), "NODE_URL");
	}
}
