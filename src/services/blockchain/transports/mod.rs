//! Network transports for node clients.
//!
//! Every transport speaks HTTP through [`HttpTransportClient`], which fails over across the
//! weighted RPC URLs of a network. EVM nodes are addressed with JSON-RPC 2.0 envelopes while EOS
//! nodes take a plain JSON body posted to a per-method `/v1/chain/*` path.

mod eos {
	pub mod http;
}
mod evm {
	pub mod http;
}

mod endpoint_manager;
mod error;
mod http;

pub use endpoint_manager::EndpointManager;
pub use eos::http::EOSTransportClient;
pub use error::TransportError;
pub use evm::http::EVMTransportClient;
pub use http::{ConnectionProbe, HttpTransportClient};

use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{
	default_on_request_failure, default_on_request_success, Retryable, RetryableStrategy,
};
use serde::Serialize;
use serde_json::{json, Value};

/// HTTP status codes that make the endpoint manager move to the next URL
/// - 429: the node is rate limiting us
pub const ROTATE_ON_ERROR_CODES: [u16; 1] = [429];

/// Base trait for all node transports
#[async_trait::async_trait]
pub trait BlockchainTransport: Send + Sync {
	/// URL requests are currently sent to
	async fn get_current_url(&self) -> String;

	/// Sends a request and returns the decoded JSON body
	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize;

	/// Builds the request body. Defaults to a JSON-RPC 2.0 envelope.
	async fn customize_request<P>(&self, method: &str, params: Option<P>) -> Value
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": method,
			"params": params.map(|p| p.into())
		})
	}

	/// URL a request for `method` is posted to. JSON-RPC posts everything to the base URL.
	fn request_url(&self, base_url: &str, _method: &str) -> String {
		base_url.to_string()
	}

	/// Replaces the HTTP client used by the endpoint manager
	fn update_endpoint_manager_client(
		&mut self,
		client: ClientWithMiddleware,
	) -> Result<(), anyhow::Error>;
}

/// Transports that can switch to a fallback URL
#[async_trait::async_trait]
pub trait RotatingTransport: BlockchainTransport {
	/// Probes `url` before it becomes the active endpoint
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error>;

	/// Makes `url` the active endpoint
	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error>;
}

/// Retries transient failures (timeouts, connection resets, 5xx and 429) and nothing else
pub struct TransientErrorRetryStrategy;

impl RetryableStrategy for TransientErrorRetryStrategy {
	fn handle(
		&self,
		res: &Result<reqwest::Response, reqwest_middleware::Error>,
	) -> Option<Retryable> {
		match res {
			Ok(success) => default_on_request_success(success),
			Err(error) => default_on_request_failure(error),
		}
	}
}

/// Extracts `result` from a JSON-RPC response, turning an `error` member into a transport error.
pub fn rpc_result(response: Value, method: &str) -> Result<Value, TransportError> {
	if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
		return Err(TransportError::response_parse(
			format!("{} returned an error: {}", method, error),
			None,
			None,
		));
	}
	match response.get("result") {
		Some(result) => Ok(result.clone()),
		None => Err(TransportError::response_parse(
			format!("{} response has no result", method),
			None,
			None,
		)),
	}
}
