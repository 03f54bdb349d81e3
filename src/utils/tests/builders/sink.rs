//! Test helper utilities for Sink configuration
//!
//! - `SinkBuilder`: Builder for creating test SinkConfig instances

use std::collections::HashMap;

use crate::{
	models::{SecretString, SecretValue, SinkConfig, SinkType, SinkTypeConfig},
	utils::RetryConfig,
};

/// Builder for creating test SinkConfig instances
pub struct SinkBuilder {
	name: String,
	active: bool,
	sink_type: Option<SinkType>,
	config: SinkTypeConfig,
}

impl Default for SinkBuilder {
	fn default() -> Self {
		Self {
			name: "test_sink".to_string(),
			active: true,
			sink_type: None,
			config: SinkTypeConfig::Webhook {
				url: plain("https://hooks.example.com/blocks"),
				method: Some("POST".to_string()),
				secret: None,
				headers: None,
				retry_policy: RetryConfig::default(),
			},
		}
	}
}

fn plain(value: &str) -> SecretValue {
	SecretValue::Plain(SecretString::new(value.to_string()))
}

impl SinkBuilder {
	/// Active webhook sink
	pub fn new() -> Self {
		Self::default()
	}

	pub fn name(mut self, name: &str) -> Self {
		self.name = name.to_string();
		self
	}

	pub fn active(mut self, active: bool) -> Self {
		self.active = active;
		self
	}

	/// Turns the sink into a webhook posting to `url`
	pub fn webhook(mut self, url: &str) -> Self {
		self.config = SinkTypeConfig::Webhook {
			url: plain(url),
			method: Some("POST".to_string()),
			secret: None,
			headers: None,
			retry_policy: RetryConfig::default(),
		};
		self
	}

	pub fn method(mut self, method: &str) -> Self {
		if let SinkTypeConfig::Webhook { method: m, .. } = &mut self.config {
			*m = Some(method.to_string());
		}
		self
	}

	pub fn secret(mut self, secret: &str) -> Self {
		if let SinkTypeConfig::Webhook { secret: s, .. } = &mut self.config {
			*s = Some(plain(secret));
		}
		self
	}

	pub fn header(mut self, key: &str, value: &str) -> Self {
		if let SinkTypeConfig::Webhook { headers, .. } = &mut self.config {
			headers
				.get_or_insert_with(HashMap::new)
				.insert(key.to_string(), value.to_string());
		}
		self
	}

	pub fn pubsub(mut self, endpoint: &str, project_id: &str, topic: &str, token: &str) -> Self {
		self.config = SinkTypeConfig::PubSub {
			endpoint: endpoint.to_string(),
			project_id: project_id.to_string(),
			topic: topic.to_string(),
			access_token: plain(token),
			retry_policy: RetryConfig::default(),
		};
		self
	}

	pub fn file(mut self, path: &str) -> Self {
		self.config = SinkTypeConfig::File {
			path: path.to_string(),
		};
		self
	}

	/// Overrides the type derived from the config, allowing mismatches
	pub fn sink_type(mut self, sink_type: SinkType) -> Self {
		self.sink_type = Some(sink_type);
		self
	}

	pub fn build(self) -> SinkConfig {
		SinkConfig {
			name: self.name,
			sink_type: self.sink_type.unwrap_or_else(|| self.config.sink_type()),
			active: self.active,
			config: self.config,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_sink() {
		let sink = SinkBuilder::new().build();
		assert_eq!(sink.name, "test_sink");
		assert_eq!(sink.sink_type, SinkType::Webhook);
		assert!(sink.active);
	}

	#[test]
	fn test_type_follows_config() {
		let sink = SinkBuilder::new()
			.pubsub("https://pubsub.example", "proj", "blocks", "token")
			.build();
		assert_eq!(sink.sink_type, SinkType::PubSub);

		let sink = SinkBuilder::new().file("out.jsonl").sink_type(SinkType::Webhook).build();
		assert_eq!(sink.sink_type, SinkType::Webhook);
	}

	#[test]
	fn test_webhook_options() {
		let sink = SinkBuilder::new()
			.secret("key")
			.header("X-Team", "data")
			.method("PUT")
			.build();
		match sink.config {
			SinkTypeConfig::Webhook {
				method,
				secret,
				headers,
				..
			} => {
				assert_eq!(method.as_deref(), Some("PUT"));
				assert_eq!(secret.map(|s| s.as_str().to_string()).as_deref(), Some("key"));
				assert_eq!(headers.unwrap()["X-Team"], "data");
			}
			other => panic!("unexpected config {:?}", other),
		}
	}
}
