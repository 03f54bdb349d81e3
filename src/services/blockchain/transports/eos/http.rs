//! REST transport for EOS nodes.
//!
//! The chain API has one path per method below `/v1/chain/` and takes the bare parameter
//! object as the request body.

use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
	models::Network,
	services::blockchain::transports::{
		BlockchainTransport, ConnectionProbe, HttpTransportClient, RotatingTransport,
		TransportError,
	},
};

const CHAIN_API_PREFIX: &str = "/v1/chain/";

/// Transport for EOS nodes. Endpoints are probed with `get_info`.
#[derive(Clone, Debug)]
pub struct EOSTransportClient {
	pub http_client: HttpTransportClient,
}

impl EOSTransportClient {
	pub async fn new(network: &Network) -> Result<Self, anyhow::Error> {
		let probe = ConnectionProbe::rest(&format!("{}get_info", CHAIN_API_PREFIX), json!({}));
		let http_client = HttpTransportClient::new(network, probe).await?;
		Ok(Self { http_client })
	}
}

#[async_trait::async_trait]
impl BlockchainTransport for EOSTransportClient {
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
		self.http_client
			.endpoint_manager
			.send_raw_request(self, method, params)
			.await
	}

	async fn customize_request<P>(&self, _method: &str, params: Option<P>) -> Value
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		params.map(|p| p.into()).unwrap_or_else(|| json!({}))
	}

	fn request_url(&self, base_url: &str, method: &str) -> String {
		format!(
			"{}{}{}",
			base_url.trim_end_matches('/'),
			CHAIN_API_PREFIX,
			method
		)
	}

	fn update_endpoint_manager_client(
		&mut self,
		client: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		self.http_client.update_endpoint_manager_client(client)
	}
}

#[async_trait::async_trait]
impl RotatingTransport for EOSTransportClient {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		self.http_client.try_connect(url).await
	}

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		self.http_client.update_client(url).await
	}
}
