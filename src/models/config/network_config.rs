//! Network configuration loading and validation.

use async_trait::async_trait;
use std::{collections::HashMap, path::Path};

use crate::{
	models::{
		config::{error::ConfigError, load_dir},
		BlockChainType, ConfigLoader, IngestionMode, Network, SecretValue,
	},
	utils::normalize_string,
};

impl Network {
	/// Smallest `max_past_blocks` that still covers one poll interval of confirmations.
	pub fn get_recommended_past_blocks(&self) -> u64 {
		self.confirmation_blocks + 1
	}
}

fn path_metadata(path: &Path) -> Option<HashMap<String, String>> {
	Some(HashMap::from([(
		"path".to_string(),
		path.display().to_string(),
	)]))
}

#[async_trait]
impl ConfigLoader for Network {
	async fn resolve_secrets(&self) -> Result<Self, ConfigError> {
		dotenvy::dotenv().ok();
		let mut network = self.clone();

		for rpc_url in &mut network.rpc_urls {
			let resolved = rpc_url.url.resolve().map_err(|e| {
				ConfigError::parse_error(
					format!("failed to resolve RPC URL: {}", e),
					Some(e as Box<dyn std::error::Error + Send + Sync>),
					None,
				)
			})?;
			rpc_url.url = SecretValue::Plain(resolved);
		}
		Ok(network)
	}

	async fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let dir = path.unwrap_or(Path::new("config/networks"));
		load_dir(dir, "networks", |p| async move { Self::load_from_path(&p).await }).await
	}

	async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let file = std::fs::File::open(path).map_err(|e| {
			ConfigError::file_error(
				format!("failed to open network config file: {}", e),
				Some(Box::new(e)),
				path_metadata(path),
			)
		})?;
		let config: Network = serde_json::from_reader(file).map_err(|e| {
			ConfigError::parse_error(
				format!("failed to parse network config: {}", e),
				Some(Box::new(e)),
				path_metadata(path),
			)
		})?;

		let config = config.resolve_secrets().await?;
		config.validate()?;

		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		let invalid = |msg: &str| {
			Err(ConfigError::validation_error(
				msg,
				None,
				Some(HashMap::from([(
					"network".to_string(),
					self.slug.clone(),
				)])),
			))
		};

		if self.name.is_empty() {
			return invalid("Network name is required");
		}

		if self.network_type == BlockChainType::Bitcoin {
			return invalid("Bitcoin networks cannot be watched");
		}

		if self.slug.is_empty()
			|| !self
				.slug
				.chars()
				.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
		{
			return invalid("Slug must contain only lowercase letters, numbers, and underscores");
		}

		if self.rpc_urls.is_empty() {
			return invalid("At least one RPC URL is required");
		}

		if !self.rpc_urls.iter().all(|u| u.type_ == "rpc") {
			return invalid("RPC URL type must be one of: rpc");
		}

		if !self
			.rpc_urls
			.iter()
			.all(|u| u.url.starts_with("http://") || u.url.starts_with("https://"))
		{
			return invalid("All RPC URLs must start with http:// or https://");
		}

		if !self.rpc_urls.iter().all(|u| u.weight <= 100) {
			return invalid("All RPC URL weights must be between 0 and 100");
		}

		if self.block_time_ms < 100 {
			return invalid("Block time must be at least 100ms");
		}

		if self.network_type == BlockChainType::EVM && self.confirmation_blocks == 0 {
			return invalid("Confirmation blocks must be greater than 0");
		}

		if self.network_type == BlockChainType::EOS && self.ingestion == IngestionMode::Subscribe {
			return invalid("EOS networks only support poll ingestion");
		}

		if self.max_concurrent_fetches == 0 {
			return invalid("max_concurrent_fetches must be greater than 0");
		}

		if self.backoff.base_delay_ms == 0 {
			return invalid("Backoff base delay must be greater than 0");
		}

		if self.backoff.max_delay_ms < self.backoff.base_delay_ms {
			return invalid("Backoff max delay must not be below the base delay");
		}

		if let Some(currency) = &self.native_currency {
			if currency.symbol.trim().is_empty() {
				return invalid("Native currency symbol is required");
			}
		}

		if let Some(max_blocks) = self.max_past_blocks {
			if max_blocks == 0 {
				return invalid("max_past_blocks must be greater than 0");
			}

			let recommended = self.get_recommended_past_blocks();
			if max_blocks < recommended {
				tracing::warn!(
					"Network '{}' max_past_blocks ({}) below recommended {} (confirmations + 1)",
					self.slug,
					max_blocks,
					recommended
				);
			}
		}

		self.validate_protocol();

		Ok(())
	}

	fn validate_protocol(&self) {
		for rpc_url in &self.rpc_urls {
			if rpc_url.url.starts_with("http://") {
				tracing::warn!(
					"Network '{}' uses an insecure RPC URL: {}",
					self.slug,
					rpc_url.url.as_str()
				);
			}
		}
	}

	fn validate_uniqueness(
		instances: &[&Self],
		current_instance: &Self,
		file_path: &str,
	) -> Result<(), ConfigError> {
		let fields: [(&str, fn(&Network) -> &String); 2] =
			[("name", |n| &n.name), ("slug", |n| &n.slug)];

		for (field_name, get) in fields {
			let value = get(current_instance);
			if instances
				.iter()
				.any(|existing| normalize_string(get(existing)) == normalize_string(value))
			{
				return Err(ConfigError::validation_error(
					format!("Duplicate network {} found: '{}'", field_name, value),
					None,
					Some(HashMap::from([
						(format!("network_{}", field_name), value.to_string()),
						("path".to_string(), file_path.to_string()),
					])),
				));
			}
		}
		Ok(())
	}
}
