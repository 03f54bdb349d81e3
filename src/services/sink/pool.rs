use crate::services::blockchain::TransientErrorRetryStrategy;
use crate::utils::client_storage::ClientStorage;
use crate::utils::{create_retryable_http_client, RetryConfig};
use reqwest::Client as ReqwestClient;
use reqwest_middleware::ClientWithMiddleware;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkPoolError {
	#[error("Failed to create HTTP client: {0}")]
	HttpClientBuildError(String),
}

/// HTTP client pool shared by the network sinks.
///
/// Sinks with the same retry policy share one client and therefore one connection pool.
pub struct SinkClientPool {
	http_clients: ClientStorage<ClientWithMiddleware>,
}

impl SinkClientPool {
	pub fn new() -> Self {
		Self {
			http_clients: ClientStorage::new(),
		}
	}

	/// Get or create an HTTP client with retry capabilities.
	///
	/// # Arguments
	/// * `retry_policy` - Configuration for HTTP retry policy
	/// # Returns
	/// * `Result<Arc<ClientWithMiddleware>, SinkPoolError>` - The shared HTTP client
	pub async fn get_or_create_http_client(
		&self,
		retry_policy: &RetryConfig,
	) -> Result<Arc<ClientWithMiddleware>, SinkPoolError> {
		let key = format!("{:?}", retry_policy);

		self.http_clients
			.get_or_try_insert(&key, || async {
				let base_client = ReqwestClient::builder()
					.pool_max_idle_per_host(10)
					.pool_idle_timeout(Some(Duration::from_secs(90)))
					.connect_timeout(Duration::from_secs(10))
					.timeout(Duration::from_secs(30))
					.build()
					.map_err(|e| SinkPoolError::HttpClientBuildError(e.to_string()))?;
				Ok(create_retryable_http_client(
					retry_policy,
					base_client,
					Some(TransientErrorRetryStrategy),
				))
			})
			.await
	}

	/// Get the number of active HTTP clients in the pool
	#[cfg(test)]
	pub async fn get_active_http_client_count(&self) -> usize {
		self.http_clients.len().await
	}
}

impl Default for SinkClientPool {
	fn default() -> Self {
		Self::new()
	}
}
