//! Client pool for node clients.
//!
//! Clients are configured lazily, once per network slug, and shared afterwards. Configuration
//! contacts the node, so a failed attempt is not cached and the next request tries again.

use crate::{
	models::{BlockChainType, ConfigError, Network},
	services::blockchain::{
		client::ConfigurableClient, EOSTransportClient, EVMTransportClient, EosClient, EvmClient,
	},
	utils::client_storage::ClientStorage,
};
use async_trait::async_trait;
use std::{any::Any, collections::HashMap, sync::Arc};

/// Trait for the client pool.
#[async_trait]
pub trait ClientPoolTrait: Send + Sync {
	type EvmClient: ConfigurableClient;
	type EosClient: ConfigurableClient;

	async fn get_evm_client(&self, network: &Network)
		-> Result<Arc<Self::EvmClient>, ConfigError>;
	async fn get_eos_client(&self, network: &Network)
		-> Result<Arc<Self::EosClient>, ConfigError>;
}

/// Cache of configured clients, one storage per chain family.
pub struct ClientPool {
	pub storages: HashMap<BlockChainType, Box<dyn Any + Send + Sync>>,
}

impl ClientPool {
	pub fn new() -> Self {
		let mut pool = Self {
			storages: HashMap::new(),
		};
		pool.register_client_type::<EvmClient<EVMTransportClient>>(BlockChainType::EVM);
		pool.register_client_type::<EosClient<EOSTransportClient>>(BlockChainType::EOS);
		pool
	}

	fn register_client_type<T: 'static + Send + Sync>(&mut self, client_type: BlockChainType) {
		self.storages
			.insert(client_type, Box::new(ClientStorage::<T>::new()));
	}

	/// Returns the cached client for `network` or configures a new one.
	async fn get_or_configure<T: ConfigurableClient>(
		&self,
		client_type: BlockChainType,
		network: &Network,
	) -> Result<Arc<T>, ConfigError> {
		let storage = self
			.storages
			.get(&client_type)
			.and_then(|s| s.downcast_ref::<ClientStorage<T>>())
			.ok_or_else(|| {
				ConfigError::validation_error(
					format!("no client registered for {}", client_type),
					None,
					None,
				)
			})?;

		storage
			.get_or_try_insert(&network.slug, || async {
				if !T::can_configure(network) {
					return Err(ConfigError::validation_error(
						format!("network {} cannot be configured", network.slug),
						None,
						Some(HashMap::from([(
							"network_type".to_string(),
							network.network_type.to_string(),
						)])),
					));
				}
				T::configure(network).await
			})
			.await
	}

	/// Number of cached clients of one family.
	pub async fn get_client_count<T: 'static>(&self, client_type: BlockChainType) -> usize {
		match self
			.storages
			.get(&client_type)
			.and_then(|s| s.downcast_ref::<ClientStorage<T>>())
		{
			Some(storage) => storage.len().await,
			None => 0,
		}
	}
}

#[async_trait]
impl ClientPoolTrait for ClientPool {
	type EvmClient = EvmClient<EVMTransportClient>;
	type EosClient = EosClient<EOSTransportClient>;

	async fn get_evm_client(
		&self,
		network: &Network,
	) -> Result<Arc<Self::EvmClient>, ConfigError> {
		self.get_or_configure(BlockChainType::EVM, network).await
	}

	async fn get_eos_client(
		&self,
		network: &Network,
	) -> Result<Arc<Self::EosClient>, ConfigError> {
		self.get_or_configure(BlockChainType::EOS, network).await
	}
}

impl Default for ClientPool {
	fn default() -> Self {
		Self::new()
	}
}
