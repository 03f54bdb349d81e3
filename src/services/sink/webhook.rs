//! Webhook sink implementation.
//!
//! Sends every block as a JSON request body to an HTTP endpoint, optionally signed with an
//! HMAC-SHA256 over the body and a millisecond timestamp.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{
	header::{HeaderMap, HeaderName, HeaderValue},
	Method,
};
use reqwest_middleware::ClientWithMiddleware;
use sha2::Sha256;
use std::{collections::HashMap, sync::Arc};

use crate::{
	models::SinkTypeConfig,
	services::sink::{Sink, SinkError},
};

/// HMAC SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Sink posting blocks to an HTTP endpoint
#[derive(Debug)]
pub struct WebhookSink {
	/// Sink name, used in logs and error metadata
	pub name: String,
	/// Webhook URL for block delivery
	pub url: String,
	/// Configured HTTP client for webhook requests with retry capabilities
	pub client: Arc<ClientWithMiddleware>,
	/// HTTP method to use for the webhook request
	pub method: Method,
	/// Secret to use for the webhook request
	pub secret: Option<String>,
	/// Headers to use for the webhook request
	pub headers: HashMap<String, String>,
}

impl WebhookSink {
	/// Creates a webhook sink from a sink configuration
	///
	/// # Arguments
	/// * `name` - Name of the sink
	/// * `config` - Sink configuration containing webhook parameters
	/// * `http_client` - HTTP client with middleware for retries
	pub fn from_config(
		name: &str,
		config: &SinkTypeConfig,
		http_client: Arc<ClientWithMiddleware>,
	) -> Result<Self, SinkError> {
		let SinkTypeConfig::Webhook {
			url,
			method,
			secret,
			headers,
			..
		} = config
		else {
			return Err(SinkError::config_error(
				format!("Invalid webhook configuration: {:?}", config.sink_type()),
				None,
				Some(HashMap::from([("sink".to_string(), name.to_string())])),
			));
		};

		let method = match method {
			Some(m) => Method::from_bytes(m.to_uppercase().as_bytes()).map_err(|e| {
				SinkError::config_error(
					format!("Invalid webhook method: {}", m),
					Some(e.into()),
					Some(HashMap::from([("sink".to_string(), name.to_string())])),
				)
			})?,
			None => Method::POST,
		};

		Ok(Self {
			name: name.to_string(),
			url: url.as_str().to_string(),
			client: http_client,
			method,
			secret: secret.as_ref().map(|s| s.as_str().to_string()),
			headers: headers.clone().unwrap_or_default(),
		})
	}

	/// Signs `payload` with the shared secret.
	///
	/// Returns the hex-encoded signature and the timestamp that was signed with it.
	pub fn sign_payload(&self, secret: &str, payload: &[u8]) -> Result<(String, String), SinkError> {
		// `HmacSha256::new_from_slice` accepts empty keys
		if secret.is_empty() {
			return Err(SinkError::config_error(
				"Invalid secret: cannot be empty.",
				None,
				None,
			));
		}

		let timestamp = Utc::now().timestamp_millis().to_string();
		let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
			SinkError::config_error(format!("Invalid secret: {}", e), None, None)
		})?;
		mac.update(payload);
		mac.update(timestamp.as_bytes());

		Ok((hex::encode(mac.finalize().into_bytes()), timestamp))
	}

	fn build_headers(&self, payload: &[u8]) -> Result<HeaderMap, SinkError> {
		let mut headers = HeaderMap::new();
		headers.insert(
			HeaderName::from_static("content-type"),
			HeaderValue::from_static("application/json"),
		);

		if let Some(secret) = &self.secret {
			let (signature, timestamp) = self.sign_payload(secret, payload)?;
			for (name, value) in [("x-signature", signature), ("x-timestamp", timestamp)] {
				headers.insert(
					HeaderName::from_static(name),
					HeaderValue::from_str(&value).map_err(|e| {
						SinkError::internal_error(
							format!("Invalid {} value", name),
							Some(e.into()),
							None,
						)
					})?,
				);
			}
		}

		for (key, value) in &self.headers {
			let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
				SinkError::config_error(
					format!("Invalid header name: {}", key),
					Some(e.into()),
					None,
				)
			})?;
			let header_value = HeaderValue::from_str(value).map_err(|e| {
				SinkError::config_error(
					format!("Invalid header value for {}: {}", key, value),
					Some(e.into()),
					None,
				)
			})?;
			headers.insert(header_name, header_value);
		}

		Ok(headers)
	}
}

#[async_trait]
impl Sink for WebhookSink {
	fn name(&self) -> &str {
		&self.name
	}

	fn can_configure(config: &SinkTypeConfig) -> bool {
		matches!(config, SinkTypeConfig::Webhook { url, .. } if !url.is_empty())
	}

	/// The endpoint is not contacted; only the URL and headers are checked.
	async fn configure(&self) -> Result<(), SinkError> {
		url::Url::parse(&self.url).map_err(|e| {
			SinkError::config_error(
				format!("Invalid webhook URL: {}", e),
				Some(e.into()),
				Some(HashMap::from([("sink".to_string(), self.name.clone())])),
			)
		})?;
		self.build_headers(b"")?;
		Ok(())
	}

	async fn publish(&self, payload: &[u8]) -> Result<(), SinkError> {
		let headers = self.build_headers(payload)?;

		let response = self
			.client
			.request(self.method.clone(), self.url.as_str())
			.headers(headers)
			.body(payload.to_vec())
			.send()
			.await
			.map_err(|e| {
				SinkError::publish_error(
					format!("Failed to send webhook request: {}", e),
					Some(e.into()),
					Some(HashMap::from([("sink".to_string(), self.name.clone())])),
				)
			})?;

		let status = response.status();
		if !status.is_success() {
			return Err(SinkError::publish_error(
				format!("Webhook request failed with status: {}", status),
				None,
				Some(HashMap::from([
					("sink".to_string(), self.name.clone()),
					("status".to_string(), status.as_u16().to_string()),
				])),
			));
		}

		Ok(())
	}
}
