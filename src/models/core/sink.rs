use crate::{models::SecretValue, utils::RetryConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_active() -> bool {
	true
}

fn default_pubsub_endpoint() -> String {
	"https://pubsub.googleapis.com".to_string()
}

/// Destination that canonical blocks are published to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
	/// Unique name identifying this sink
	pub name: String,

	/// Type of sink (Webhook, PubSub, File)
	pub sink_type: SinkType,

	/// Inactive sinks are loaded and validated but never configured
	#[serde(default = "default_active")]
	pub active: bool,

	/// Configuration specific to the sink type
	pub config: SinkTypeConfig,
}

/// Supported sink types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[serde(deny_unknown_fields)]
pub enum SinkType {
	/// HTTP POST of the block JSON
	Webhook,
	/// Google Cloud Pub/Sub topic
	PubSub,
	/// JSON lines appended to a local file
	File,
}

/// Type-specific configuration for sinks
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
#[serde(untagged)]
pub enum SinkTypeConfig {
	Webhook {
		/// Endpoint URL
		url: SecretValue,
		/// HTTP method, POST when unset
		method: Option<String>,
		/// HMAC key for the `x-signature` header
		secret: Option<SecretValue>,
		/// Extra HTTP headers
		headers: Option<HashMap<String, String>>,
		/// Retry policy for HTTP requests
		#[serde(default)]
		retry_policy: RetryConfig,
	},
	PubSub {
		/// REST endpoint of the Pub/Sub service
		#[serde(default = "default_pubsub_endpoint")]
		endpoint: String,
		/// Cloud project owning the topic
		project_id: String,
		/// Topic name, created when missing
		topic: String,
		/// OAuth bearer token
		access_token: SecretValue,
		/// Retry policy for HTTP requests
		#[serde(default)]
		retry_policy: RetryConfig,
	},
	File {
		/// Output file, created when missing
		path: String,
	},
}

impl SinkTypeConfig {
	/// Sink type this configuration belongs to.
	pub fn sink_type(&self) -> SinkType {
		match self {
			Self::Webhook { .. } => SinkType::Webhook,
			Self::PubSub { .. } => SinkType::PubSub,
			Self::File { .. } => SinkType::File,
		}
	}

	pub fn retry_policy(&self) -> Option<&RetryConfig> {
		match self {
			Self::Webhook { retry_policy, .. } | Self::PubSub { retry_policy, .. } => {
				Some(retry_policy)
			}
			Self::File { .. } => None,
		}
	}
}
