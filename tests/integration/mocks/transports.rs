use mockall::mock;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use chainwatch::services::blockchain::{BlockchainTransport, RotatingTransport, TransportError};

// Mocked transports never rotate
macro_rules! impl_static_rotation {
	($transport:ty) => {
		#[async_trait::async_trait]
		impl RotatingTransport for $transport {
			async fn try_connect(&self, _url: &str) -> Result<(), anyhow::Error> {
				Ok(())
			}

			async fn update_client(&self, _url: &str) -> Result<(), anyhow::Error> {
				Ok(())
			}
		}
	};
}

// JSON-RPC transport of an EVM node, params arrive as the positional array
mock! {
	pub EVMTransportClient {
		pub async fn send_raw_request(&self, method: &str, params: Option<Vec<Value>>) -> Result<Value, TransportError>;
		pub async fn get_current_url(&self) -> String;
	}

	impl Clone for EVMTransportClient {
		fn clone(&self) -> Self;
	}
}

#[async_trait::async_trait]
impl BlockchainTransport for MockEVMTransportClient {
	async fn get_current_url(&self) -> String {
		self.get_current_url().await
	}

	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		let positional = params.and_then(|p| Into::<Value>::into(p).as_array().cloned());
		self.send_raw_request(method, positional).await
	}

	fn update_endpoint_manager_client(
		&mut self,
		_: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		Ok(())
	}
}

impl_static_rotation!(MockEVMTransportClient);

// Chain API transport of an EOS node, the body object is passed through unchanged
mock! {
	pub EOSTransportClient {
		pub async fn send_raw_request(&self, method: &str, params: Option<Value>) -> Result<Value, TransportError>;
		pub async fn get_current_url(&self) -> String;
	}

	impl Clone for EOSTransportClient {
		fn clone(&self) -> Self;
	}
}

#[async_trait::async_trait]
impl BlockchainTransport for MockEOSTransportClient {
	async fn get_current_url(&self) -> String {
		self.get_current_url().await
	}

	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		self.send_raw_request(method, params.map(Into::into)).await
	}

	fn update_endpoint_manager_client(
		&mut self,
		_: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		Ok(())
	}
}

impl_static_rotation!(MockEOSTransportClient);

/// Transport driving an `EndpointManager` against mock servers.
///
/// Candidates are probed with a plain GET. With `reject_switch` set, every switch to a new
/// URL fails after the probe succeeded.
#[derive(Clone)]
pub struct ProbingTransport {
	client: reqwest::Client,
	pub current_url: Arc<RwLock<String>>,
	reject_switch: bool,
}

impl ProbingTransport {
	pub fn new() -> Self {
		Self {
			client: reqwest::Client::new(),
			current_url: Arc::new(RwLock::new(String::new())),
			reject_switch: false,
		}
	}

	pub fn rejecting_switch(current_url: &str) -> Self {
		Self {
			current_url: Arc::new(RwLock::new(current_url.to_string())),
			reject_switch: true,
			..Self::new()
		}
	}
}

#[async_trait::async_trait]
impl BlockchainTransport for ProbingTransport {
	async fn get_current_url(&self) -> String {
		self.current_url.read().await.clone()
	}

	async fn send_raw_request<P: Into<Value> + Send + Clone + Serialize>(
		&self,
		_method: &str,
		_params: Option<P>,
	) -> Result<Value, TransportError> {
		Ok(json!({"jsonrpc": "2.0", "result": null, "id": 1}))
	}

	fn update_endpoint_manager_client(
		&mut self,
		_: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		Ok(())
	}
}

#[async_trait::async_trait]
impl RotatingTransport for ProbingTransport {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		self.client
			.get(url)
			.send()
			.await
			.map(|_| ())
			.map_err(|e| anyhow::anyhow!("probe of {} failed: {}", url, e))
	}

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		if self.reject_switch {
			return Err(anyhow::anyhow!("refusing to switch to {}", url));
		}
		*self.current_url.write().await = url.to_string();
		Ok(())
	}
}
