//! Sink configuration repository implementation.
//!
//! Loads every sink definition from `config/sinks` (or a given directory). Inactive sinks are
//! loaded and validated like the rest but never handed to the control loop.

#![allow(clippy::result_large_err)]

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;

use crate::{
	models::{ConfigLoader, SinkConfig},
	repositories::error::RepositoryError,
};

/// Repository for storing and retrieving sink configurations
#[derive(Clone, Debug, Default)]
pub struct SinkRepository {
	/// Map of sink names to their configurations
	pub sinks: HashMap<String, SinkConfig>,
}

/// Interface for sink repository implementations
#[async_trait]
pub trait SinkRepositoryTrait: Clone + Send + Sync {
	/// Loads the repository from `path`, or from the default directory
	async fn new(path: Option<&Path>) -> Result<Self, RepositoryError>
	where
		Self: Sized;

	/// Get a specific sink by name
	fn get(&self, sink_name: &str) -> Option<SinkConfig>;

	/// Get all sinks, active or not
	fn get_all(&self) -> HashMap<String, SinkConfig>;

	/// Active sinks, ordered by name
	fn get_active(&self) -> Vec<SinkConfig> {
		let mut sinks: Vec<SinkConfig> = self
			.get_all()
			.into_values()
			.filter(|s| s.active)
			.collect();
		sinks.sort_by(|a, b| a.name.cmp(&b.name));
		sinks
	}
}

impl SinkRepository {
	pub fn from_sinks(sinks: impl IntoIterator<Item = SinkConfig>) -> Self {
		Self {
			sinks: sinks.into_iter().map(|s| (s.name.clone(), s)).collect(),
		}
	}
}

#[async_trait]
impl SinkRepositoryTrait for SinkRepository {
	async fn new(path: Option<&Path>) -> Result<Self, RepositoryError> {
		let loaded: HashMap<String, SinkConfig> =
			SinkConfig::load_all(path).await.map_err(|e| {
				RepositoryError::load_error(
					"Failed to load sinks",
					Some(Box::new(e)),
					Some(HashMap::from([(
						"path".to_string(),
						path.map_or_else(|| "default".to_string(), |p| p.display().to_string()),
					)])),
				)
			})?;
		Ok(Self::from_sinks(loaded.into_values()))
	}

	fn get(&self, sink_name: &str) -> Option<SinkConfig> {
		self.sinks.get(sink_name).cloned()
	}

	fn get_all(&self) -> HashMap<String, SinkConfig> {
		self.sinks.clone()
	}
}
