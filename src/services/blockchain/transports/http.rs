//! HTTP transport shared by every node client.
//!
//! Picks the heaviest RPC URL that answers a probe request, keeps the others as fallbacks and
//! retries transient failures through `reqwest-retry`.

use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::{
	models::Network,
	services::blockchain::transports::{
		BlockchainTransport, EndpointManager, RotatingTransport, TransientErrorRetryStrategy,
		TransportError,
	},
	utils::http::{create_retryable_http_client, RetryConfig},
};

/// Request used to check that an endpoint is alive before it is used.
#[derive(Clone, Debug)]
pub struct ConnectionProbe {
	/// Appended to the endpoint URL, e.g. `/v1/chain/get_info`
	pub path: Option<String>,
	/// JSON body posted to the endpoint
	pub body: Value,
}

impl ConnectionProbe {
	/// JSON-RPC call with no parameters, posted to the endpoint itself.
	pub fn json_rpc(method: &str) -> Self {
		Self {
			path: None,
			body: json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": []}),
		}
	}

	/// Plain JSON body posted to `path` below the endpoint.
	pub fn rest(path: &str, body: Value) -> Self {
		Self {
			path: Some(path.to_string()),
			body,
		}
	}

	fn url_for(&self, base: &str) -> String {
		match &self.path {
			Some(path) => format!("{}{}", base.trim_end_matches('/'), path),
			None => base.to_string(),
		}
	}
}

impl Default for ConnectionProbe {
	fn default() -> Self {
		Self::json_rpc("net_version")
	}
}

/// HTTP client with weighted endpoint failover.
///
/// Cheap to clone; clones share the endpoint state.
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	/// Retryable HTTP client for making requests
	pub client: ClientWithMiddleware,
	pub(crate) endpoint_manager: EndpointManager,
	probe: ConnectionProbe,
}

impl HttpTransportClient {
	/// Connects to the first RPC URL, by descending weight, that answers `probe`.
	///
	/// URLs with weight 0 are never used.
	pub async fn new(network: &Network, probe: ConnectionProbe) -> Result<Self, anyhow::Error> {
		let mut rpc_urls: Vec<_> = network
			.rpc_urls
			.iter()
			.filter(|rpc_url| rpc_url.type_ == "rpc" && rpc_url.weight > 0)
			.collect();
		rpc_urls.sort_by(|a, b| b.weight.cmp(&a.weight));

		let base_http_client = reqwest::ClientBuilder::new()
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(32)
			.timeout(Duration::from_secs(30))
			.connect_timeout(Duration::from_secs(20))
			.build()
			.context("Failed to create base HTTP client")?;

		let retryable_client = create_retryable_http_client(
			&RetryConfig::default(),
			base_http_client,
			Some(TransientErrorRetryStrategy),
		);

		for rpc_url in rpc_urls.iter() {
			let candidate = rpc_url.url.as_str().trim_end_matches('/');
			if Url::parse(candidate).is_err() {
				tracing::warn!(network = %network.slug, "skipping unparsable RPC URL");
				continue;
			}

			match retryable_client
				.post(probe.url_for(candidate))
				.json(&probe.body)
				.send()
				.await
			{
				Ok(response) if response.status().is_success() => {
					let fallback_urls: Vec<String> = rpc_urls
						.iter()
						.filter(|other| other.url != rpc_url.url)
						.map(|other| other.url.as_str().trim_end_matches('/').to_string())
						.collect();

					return Ok(Self {
						client: retryable_client.clone(),
						endpoint_manager: EndpointManager::new(
							retryable_client,
							candidate,
							fallback_urls,
						),
						probe,
					});
				}
				Ok(response) => {
					tracing::debug!(status = %response.status(), "RPC URL rejected probe");
				}
				Err(e) => {
					tracing::debug!(error = %e, "RPC URL probe failed");
				}
			}
		}

		Err(anyhow::anyhow!(
			"All RPC URLs failed to connect for network {}",
			network.slug
		))
	}
}

#[async_trait]
impl BlockchainTransport for HttpTransportClient {
	async fn get_current_url(&self) -> String {
		self.endpoint_manager.active_url.read().await.clone()
	}

	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		self.endpoint_manager
			.send_raw_request(self, method, params)
			.await
	}

	fn update_endpoint_manager_client(
		&mut self,
		client: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		self.endpoint_manager.update_client(client);
		Ok(())
	}
}

#[async_trait]
impl RotatingTransport for HttpTransportClient {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		let parsed = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;
		let response = self
			.client
			.post(self.probe.url_for(parsed.as_str()))
			.json(&self.probe.body)
			.send()
			.await
			.map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", url, e))?;

		if !response.status().is_success() {
			return Err(anyhow::anyhow!(
				"Failed to connect to {}: {}",
				url,
				response.status().as_u16()
			));
		}
		Ok(())
	}

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		let parsed = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;
		*self.endpoint_manager.active_url.write().await =
			parsed.as_str().trim_end_matches('/').to_string();
		Ok(())
	}
}
