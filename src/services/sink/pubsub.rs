//! Google Cloud Pub/Sub sink implementation.
//!
//! Talks to the Pub/Sub REST API: the topic is looked up on configuration and created when it
//! is missing, then every block is published as one base64 encoded message.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::json;
use std::{collections::HashMap, sync::Arc};

use crate::{
	models::{SecretValue, SinkTypeConfig},
	services::sink::{Sink, SinkError},
};

/// Sink publishing blocks to a Pub/Sub topic
#[derive(Debug)]
pub struct PubSubSink {
	pub name: String,
	/// Base URL of the REST API
	pub endpoint: String,
	pub project_id: String,
	pub topic: String,
	access_token: SecretValue,
	pub client: Arc<ClientWithMiddleware>,
}

impl PubSubSink {
	/// Creates a Pub/Sub sink from a sink configuration
	pub fn from_config(
		name: &str,
		config: &SinkTypeConfig,
		http_client: Arc<ClientWithMiddleware>,
	) -> Result<Self, SinkError> {
		let SinkTypeConfig::PubSub {
			endpoint,
			project_id,
			topic,
			access_token,
			..
		} = config
		else {
			return Err(SinkError::config_error(
				format!("Invalid Pub/Sub configuration: {:?}", config.sink_type()),
				None,
				Some(HashMap::from([("sink".to_string(), name.to_string())])),
			));
		};

		Ok(Self {
			name: name.to_string(),
			endpoint: endpoint.trim_end_matches('/').to_string(),
			project_id: project_id.clone(),
			topic: topic.clone(),
			access_token: access_token.clone(),
			client: http_client,
		})
	}

	/// Full resource URL of the topic
	pub fn topic_url(&self) -> String {
		format!(
			"{}/v1/projects/{}/topics/{}",
			self.endpoint,
			urlencoding::encode(&self.project_id),
			urlencoding::encode(&self.topic)
		)
	}

	fn metadata(&self) -> Option<HashMap<String, String>> {
		Some(HashMap::from([
			("sink".to_string(), self.name.clone()),
			("topic".to_string(), self.topic.clone()),
		]))
	}

	async fn topic_exists(&self) -> Result<bool, SinkError> {
		let response = self
			.client
			.get(self.topic_url())
			.bearer_auth(self.access_token.as_str())
			.send()
			.await
			.map_err(|e| {
				SinkError::config_error(
					format!("Failed to look up topic: {}", e),
					Some(e.into()),
					self.metadata(),
				)
			})?;

		match response.status() {
			status if status.is_success() => Ok(true),
			StatusCode::NOT_FOUND => Ok(false),
			status => Err(SinkError::config_error(
				format!("Topic lookup failed with status: {}", status),
				None,
				self.metadata(),
			)),
		}
	}

	async fn create_topic(&self) -> Result<(), SinkError> {
		let response = self
			.client
			.put(self.topic_url())
			.bearer_auth(self.access_token.as_str())
			.json(&json!({}))
			.send()
			.await
			.map_err(|e| {
				SinkError::config_error(
					format!("Failed to create topic: {}", e),
					Some(e.into()),
					self.metadata(),
				)
			})?;

		match response.status() {
			status if status.is_success() => {
				tracing::info!("Created Pub/Sub topic {}", self.topic);
				Ok(())
			}
			// Someone else created it between our lookup and this call
			StatusCode::CONFLICT => {
				tracing::debug!("Pub/Sub topic {} already exists", self.topic);
				Ok(())
			}
			status => Err(SinkError::config_error(
				format!("Topic creation failed with status: {}", status),
				None,
				self.metadata(),
			)),
		}
	}
}

#[async_trait]
impl Sink for PubSubSink {
	fn name(&self) -> &str {
		&self.name
	}

	fn can_configure(config: &SinkTypeConfig) -> bool {
		matches!(
			config,
			SinkTypeConfig::PubSub { project_id, topic, access_token, .. }
				if !project_id.is_empty() && !topic.is_empty() && !access_token.is_empty()
		)
	}

	/// Makes sure the topic exists, creating it when it does not.
	async fn configure(&self) -> Result<(), SinkError> {
		if self.topic_exists().await? {
			return Ok(());
		}
		self.create_topic().await
	}

	async fn publish(&self, payload: &[u8]) -> Result<(), SinkError> {
		let body = json!({
			"messages": [{ "data": STANDARD.encode(payload) }]
		});

		let response = self
			.client
			.post(format!("{}:publish", self.topic_url()))
			.bearer_auth(self.access_token.as_str())
			.json(&body)
			.send()
			.await
			.map_err(|e| {
				SinkError::publish_error(
					format!("Failed to publish message: {}", e),
					Some(e.into()),
					self.metadata(),
				)
			})?;

		let status = response.status();
		if !status.is_success() {
			let mut metadata = self.metadata().unwrap_or_default();
			metadata.insert("status".to_string(), status.as_u16().to_string());
			return Err(SinkError::publish_error(
				format!("Publish failed with status: {}", status),
				None,
				Some(metadata),
			));
		}

		Ok(())
	}
}
