//! Sink service implementation.
//!
//! Sinks receive every canonical block that leaves the pipeline. A [`SinkSet`] holds the sinks
//! that configured successfully and delivers each block to all of them at once; a failing sink
//! only ever affects itself.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

mod error;
mod file;
mod pool;
mod pubsub;
mod webhook;

use crate::{
	models::{CanonicalBlock, SinkConfig, SinkType, SinkTypeConfig},
	utils::logging::error::TraceableError,
};

pub use error::SinkError;
pub use file::FileSink;
pub use pool::{SinkClientPool, SinkPoolError};
pub use pubsub::PubSubSink;
pub use webhook::WebhookSink;

/// Destination for serialized blocks
#[async_trait]
pub trait Sink: Send + Sync {
	fn name(&self) -> &str;

	/// Whether `config` carries what this sink needs. Never touches the target.
	fn can_configure(config: &SinkTypeConfig) -> bool
	where
		Self: Sized;

	/// Makes sure the target exists, creating it when needed
	///
	/// Losing a create race to another process counts as success.
	async fn configure(&self) -> Result<(), SinkError>;

	/// Delivers one serialized block
	async fn publish(&self, payload: &[u8]) -> Result<(), SinkError>;

	/// Publishes `payload`, logging a failure instead of returning it
	async fn push(&self, payload: &[u8]) -> bool {
		match self.publish(payload).await {
			Ok(()) => true,
			Err(e) => {
				tracing::error!(
					sink = %self.name(),
					trace_id = %e.trace_id(),
					"Failed to push block: {}",
					e
				);
				false
			}
		}
	}
}

/// Builds the sink described by `config` without contacting its target.
pub async fn create_sink(
	config: &SinkConfig,
	client_pool: &SinkClientPool,
) -> Result<Arc<dyn Sink>, SinkError> {
	let supported = match config.sink_type {
		SinkType::Webhook => WebhookSink::can_configure(&config.config),
		SinkType::PubSub => PubSubSink::can_configure(&config.config),
		SinkType::File => FileSink::can_configure(&config.config),
	};
	if !supported {
		return Err(SinkError::config_error(
			format!("Sink {} cannot be configured", config.name),
			None,
			Some(std::collections::HashMap::from([(
				"sink_type".to_string(),
				format!("{:?}", config.sink_type),
			)])),
		));
	}

	let http_client = match config.config.retry_policy() {
		Some(policy) => Some(
			client_pool
				.get_or_create_http_client(policy)
				.await
				.map_err(|e| {
					SinkError::internal_error(
						"Failed to create HTTP client",
						Some(Box::new(e)),
						None,
					)
				})?,
		),
		None => None,
	};

	let sink: Arc<dyn Sink> = match (config.sink_type, http_client) {
		(SinkType::Webhook, Some(client)) => Arc::new(WebhookSink::from_config(
			&config.name,
			&config.config,
			client,
		)?),
		(SinkType::PubSub, Some(client)) => Arc::new(PubSubSink::from_config(
			&config.name,
			&config.config,
			client,
		)?),
		(SinkType::File, _) => Arc::new(FileSink::from_config(&config.name, &config.config)?),
		(sink_type, None) => {
			return Err(SinkError::internal_error(
				format!("{:?} sink needs an HTTP client", sink_type),
				None,
				None,
			))
		}
	};
	Ok(sink)
}

/// The sinks that configured successfully.
#[derive(Clone, Default)]
pub struct SinkSet {
	sinks: Vec<Arc<dyn Sink>>,
}

impl SinkSet {
	pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
		Self { sinks }
	}

	/// Configures every candidate concurrently and keeps the ones that succeed.
	pub async fn configure(candidates: Vec<Arc<dyn Sink>>) -> Self {
		let results = join_all(candidates.iter().map(|sink| sink.configure())).await;

		let sinks = candidates
			.into_iter()
			.zip(results)
			.filter_map(|(sink, result)| match result {
				Ok(()) => {
					tracing::info!("Sink {} configured", sink.name());
					Some(sink)
				}
				Err(e) => {
					tracing::error!(
						trace_id = %e.trace_id(),
						"Skipping sink {}: {}",
						sink.name(),
						e
					);
					None
				}
			})
			.collect();

		Self { sinks }
	}

	pub fn len(&self) -> usize {
		self.sinks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sinks.is_empty()
	}

	pub fn names(&self) -> Vec<&str> {
		self.sinks.iter().map(|s| s.name()).collect()
	}

	/// Serializes `block` once and pushes it to every sink concurrently.
	///
	/// Returns how many sinks accepted the block.
	pub async fn fan_out(&self, block: &CanonicalBlock) -> Result<usize, SinkError> {
		let payload = serde_json::to_vec(block).map_err(|e| {
			SinkError::internal_error(
				format!("Failed to serialize block {}", block.number),
				Some(Box::new(e)),
				None,
			)
		})?;

		let delivered = join_all(self.sinks.iter().map(|sink| sink.push(&payload)))
			.await
			.into_iter()
			.filter(|ok| *ok)
			.count();

		if delivered < self.sinks.len() {
			tracing::warn!(
				"Block {} of {} reached {}/{} sinks",
				block.number,
				block.network_slug,
				delivered,
				self.sinks.len()
			);
		}
		Ok(delivered)
	}
}
