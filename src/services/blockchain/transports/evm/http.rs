//! JSON-RPC transport for EVM nodes.

use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::Value;

use crate::{
	models::Network,
	services::blockchain::transports::{
		BlockchainTransport, ConnectionProbe, HttpTransportClient, RotatingTransport,
		TransportError,
	},
};

/// Transport for EVM-compatible nodes. Endpoints are probed with `eth_chainId`.
#[derive(Clone, Debug)]
pub struct EVMTransportClient {
	pub http_client: HttpTransportClient,
}

impl EVMTransportClient {
	pub async fn new(network: &Network) -> Result<Self, anyhow::Error> {
		let http_client =
			HttpTransportClient::new(network, ConnectionProbe::json_rpc("eth_chainId")).await?;
		Ok(Self { http_client })
	}
}

#[async_trait::async_trait]
impl BlockchainTransport for EVMTransportClient {
	async fn get_current_url(&self) -> String {
		self.http_client.get_current_url().await
	}

	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		self.http_client.send_raw_request(method, params).await
	}

	fn update_endpoint_manager_client(
		&mut self,
		client: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		self.http_client.update_endpoint_manager_client(client)
	}
}

#[async_trait::async_trait]
impl RotatingTransport for EVMTransportClient {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		self.http_client.try_connect(url).await
	}

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		self.http_client.update_client(url).await
	}
}
