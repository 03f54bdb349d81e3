//! Network configuration repository implementation.
//!
//! Loads every network definition from `config/networks` (or a given directory) once at
//! startup and hands out copies.

#![allow(clippy::result_large_err)]

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;

use crate::{
	models::{BlockChainType, ConfigLoader, Network},
	repositories::error::RepositoryError,
};

/// Repository for storing and retrieving network configurations
#[derive(Clone, Debug, Default)]
pub struct NetworkRepository {
	/// Map of network slugs to their configurations
	pub networks: HashMap<String, Network>,
}

/// Interface for network repository implementations
#[async_trait]
pub trait NetworkRepositoryTrait: Clone + Send + Sync {
	/// Loads the repository from `path`, or from the default directory
	async fn new(path: Option<&Path>) -> Result<Self, RepositoryError>
	where
		Self: Sized;

	/// Get a specific network by slug
	fn get(&self, network_slug: &str) -> Option<Network>;

	/// Get all networks
	fn get_all(&self) -> HashMap<String, Network>;
}

impl NetworkRepository {
	pub fn from_networks(networks: impl IntoIterator<Item = Network>) -> Self {
		Self {
			networks: networks
				.into_iter()
				.map(|n| (n.slug.clone(), n))
				.collect(),
		}
	}

	/// Networks of one chain family, ordered by slug
	pub fn get_by_type(&self, network_type: BlockChainType) -> Vec<Network> {
		let mut networks: Vec<Network> = self
			.networks
			.values()
			.filter(|n| n.network_type == network_type)
			.cloned()
			.collect();
		networks.sort_by(|a, b| a.slug.cmp(&b.slug));
		networks
	}
}

#[async_trait]
impl NetworkRepositoryTrait for NetworkRepository {
	async fn new(path: Option<&Path>) -> Result<Self, RepositoryError> {
		let loaded: HashMap<String, Network> = Network::load_all(path).await.map_err(|e| {
			RepositoryError::load_error(
				"Failed to load networks",
				Some(Box::new(e)),
				Some(HashMap::from([(
					"path".to_string(),
					path.map_or_else(|| "default".to_string(), |p| p.display().to_string()),
				)])),
			)
		})?;
		// Keyed by slug rather than file name
		Ok(Self::from_networks(loaded.into_values()))
	}

	fn get(&self, network_slug: &str) -> Option<Network> {
		self.networks.get(network_slug).cloned()
	}

	fn get_all(&self) -> HashMap<String, Network> {
		self.networks.clone()
	}
}
