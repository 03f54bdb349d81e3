//! Sink configuration loading and validation.

use async_trait::async_trait;
use std::{collections::HashMap, path::Path};

use crate::{
	models::{
		config::{error::ConfigError, load_dir},
		ConfigLoader, SecretValue, SinkConfig, SinkTypeConfig,
	},
	utils::normalize_string,
};

const SUPPORTED_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];

fn resolve(secret: &SecretValue, what: &str) -> Result<SecretValue, ConfigError> {
	secret
		.resolve()
		.map(SecretValue::Plain)
		.map_err(|e| {
			ConfigError::parse_error(
				format!("failed to resolve {}: {}", what, e),
				Some(e as Box<dyn std::error::Error + Send + Sync>),
				None,
			)
		})
}

#[async_trait]
impl ConfigLoader for SinkConfig {
	async fn resolve_secrets(&self) -> Result<Self, ConfigError> {
		dotenvy::dotenv().ok();
		let mut sink = self.clone();

		match &mut sink.config {
			SinkTypeConfig::Webhook { url, secret, .. } => {
				*url = resolve(url, "webhook URL")?;
				if let Some(secret) = secret {
					*secret = resolve(secret, "webhook secret")?;
				}
			}
			SinkTypeConfig::PubSub { access_token, .. } => {
				*access_token = resolve(access_token, "Pub/Sub access token")?;
			}
			SinkTypeConfig::File { .. } => {}
		}

		Ok(sink)
	}

	async fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let dir = path.unwrap_or(Path::new("config/sinks"));
		load_dir(dir, "sinks", |p| async move { Self::load_from_path(&p).await }).await
	}

	async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let metadata = || {
			Some(HashMap::from([(
				"path".to_string(),
				path.display().to_string(),
			)]))
		};

		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::file_error(
				format!("failed to open sink config file: {}", e),
				Some(Box::new(e)),
				metadata(),
			)
		})?;
		let config: SinkConfig = serde_json::from_str(&content).map_err(|e| {
			ConfigError::parse_error(
				format!("failed to parse sink config: {}", e),
				Some(Box::new(e)),
				metadata(),
			)
		})?;

		let config = config.resolve_secrets().await?;
		config.validate()?;

		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		let invalid = |msg: String| {
			Err(ConfigError::validation_error(
				msg,
				None,
				Some(HashMap::from([("sink".to_string(), self.name.clone())])),
			))
		};

		if self.name.trim().is_empty() {
			return invalid("Sink name is required".to_string());
		}

		if self.config.sink_type() != self.sink_type {
			return invalid(format!(
				"Sink type {:?} does not match its config",
				self.sink_type
			));
		}

		match &self.config {
			SinkTypeConfig::Webhook {
				url,
				method,
				secret,
				..
			} => {
				if !url.starts_with("http://") && !url.starts_with("https://") {
					return invalid("Invalid webhook URL format".to_string());
				}
				if let Some(method) = method {
					if !SUPPORTED_METHODS.contains(&method.to_uppercase().as_str()) {
						return invalid(format!(
							"Webhook method must be one of: {}",
							SUPPORTED_METHODS.join(", ")
						));
					}
				}
				if secret.as_ref().is_some_and(|s| s.is_empty()) {
					return invalid("Webhook secret must not be empty when set".to_string());
				}
			}
			SinkTypeConfig::PubSub {
				endpoint,
				project_id,
				topic,
				access_token,
				..
			} => {
				if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
					return invalid("Invalid Pub/Sub endpoint format".to_string());
				}
				if project_id.trim().is_empty() {
					return invalid("Pub/Sub project_id is required".to_string());
				}
				if topic.trim().is_empty() || topic.contains('/') {
					return invalid("Pub/Sub topic must be a bare topic name".to_string());
				}
				if access_token.is_empty() {
					return invalid("Pub/Sub access_token is required".to_string());
				}
			}
			SinkTypeConfig::File { path } => {
				if path.trim().is_empty() {
					return invalid("File sink path is required".to_string());
				}
			}
		}

		self.validate_protocol();
		Ok(())
	}

	fn validate_protocol(&self) {
		let endpoint = match &self.config {
			SinkTypeConfig::Webhook { url, .. } => url.as_str(),
			SinkTypeConfig::PubSub { endpoint, .. } => endpoint.as_str(),
			SinkTypeConfig::File { .. } => return,
		};
		if endpoint.starts_with("http://") {
			tracing::warn!("Sink '{}' uses an insecure endpoint: {}", self.name, endpoint);
		}
	}

	fn validate_uniqueness(
		instances: &[&Self],
		current_instance: &Self,
		file_path: &str,
	) -> Result<(), ConfigError> {
		let name = normalize_string(&current_instance.name);
		if instances
			.iter()
			.any(|existing| normalize_string(&existing.name) == name)
		{
			return Err(ConfigError::validation_error(
				format!("Duplicate sink name found: '{}'", current_instance.name),
				None,
				Some(HashMap::from([
					("sink_name".to_string(), current_instance.name.clone()),
					("path".to_string(), file_path.to_string()),
				])),
			));
		}
		Ok(())
	}
}
