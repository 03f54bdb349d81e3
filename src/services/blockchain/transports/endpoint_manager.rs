//! Failover across the RPC URLs of a network.
//!
//! Requests go to the active URL. A network error, or a status listed in
//! [`ROTATE_ON_ERROR_CODES`], promotes the first healthy fallback and retries the request there.
//! The demoted URL goes to the back of the fallback list.

use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

use crate::services::blockchain::transports::{
	RotatingTransport, TransportError, ROTATE_ON_ERROR_CODES,
};

/// Active URL plus ordered fallbacks, shared by every clone of a transport.
#[derive(Clone, Debug)]
pub struct EndpointManager {
	pub active_url: Arc<RwLock<String>>,
	pub fallback_urls: Arc<RwLock<Vec<String>>>,
	client: ClientWithMiddleware,
	rotation_lock: Arc<Mutex<()>>,
}

/// Result of a single send on one URL
#[derive(Debug)]
enum Attempt {
	/// A response arrived; its status may still be an error
	Response(reqwest::Response),
	/// The request never got a response
	Network(reqwest_middleware::Error),
	/// The body could not be serialized, which no other URL will fix
	Serialization(TransportError),
}

impl EndpointManager {
	pub fn new(client: ClientWithMiddleware, active_url: &str, fallback_urls: Vec<String>) -> Self {
		Self {
			active_url: Arc::new(RwLock::new(active_url.to_string())),
			fallback_urls: Arc::new(RwLock::new(fallback_urls)),
			rotation_lock: Arc::new(Mutex::new(())),
			client,
		}
	}

	/// Swaps the HTTP client, e.g. to change its retry policy.
	pub fn update_client(&mut self, client: ClientWithMiddleware) {
		self.client = client;
	}

	/// Promotes the first fallback that accepts a connection.
	///
	/// Rotations are serialized. Returns the new active URL.
	pub async fn try_rotate_url<T: RotatingTransport>(
		&self,
		transport: &T,
	) -> Result<String, TransportError> {
		let _guard = self.rotation_lock.lock().await;
		let previous = self.active_url.read().await.clone();
		let fallbacks = self.fallback_urls.read().await.clone();

		let Some(candidate) = fallbacks.iter().find(|url| **url != previous).cloned() else {
			return Err(TransportError::url_rotation(
				format!("no fallback URL available, active is '{}'", previous),
				None,
				Some(HashMap::from([("active_url".to_string(), previous)])),
			));
		};

		tracing::debug!(from = %previous, to = %candidate, "rotating RPC URL");

		transport.try_connect(&candidate).await.map_err(|e| {
			TransportError::url_rotation(
				format!("failed to connect to '{}'", candidate),
				Some(e.into()),
				None,
			)
		})?;
		transport.update_client(&candidate).await.map_err(|e| {
			TransportError::url_rotation(
				format!("failed to switch transport to '{}'", candidate),
				Some(e.into()),
				None,
			)
		})?;

		let mut active = self.active_url.write().await;
		let mut fallback_guard = self.fallback_urls.write().await;
		let mut next: Vec<String> = fallback_guard
			.iter()
			.filter(|url| **url != candidate)
			.cloned()
			.collect();
		next.push(previous);
		*fallback_guard = next;
		*active = candidate.clone();

		Ok(candidate)
	}

	async fn attempt<T, P>(&self, url: &str, transport: &T, method: &str, params: Option<P>) -> Attempt
	where
		T: RotatingTransport,
		P: Into<Value> + Send + Clone + Serialize,
	{
		let body = transport.customize_request(method, params).await;
		let body = match serde_json::to_string(&body) {
			Ok(body) => body,
			Err(e) => {
				return Attempt::Serialization(TransportError::request_serialization(
					format!("failed to serialize {} request", method),
					Some(Box::new(e)),
					None,
				))
			}
		};

		match self
			.client
			.post(transport.request_url(url, method))
			.header("Content-Type", "application/json")
			.body(body)
			.send()
			.await
		{
			Ok(response) => Attempt::Response(response),
			Err(e) => Attempt::Network(e),
		}
	}

	/// Sends `method` to the active URL, rotating and retrying on network errors and
	/// rate limiting.
	///
	/// Each fallback is tried at most once per request.
	pub async fn send_raw_request<T, P>(
		&self,
		transport: &T,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		T: RotatingTransport,
		P: Into<Value> + Send + Clone + Serialize,
	{
		let mut rotations_left = self.fallback_urls.read().await.len();
		loop {
			let url = self.active_url.read().await.clone();

			match self.attempt(&url, transport, method, params.clone()).await {
				Attempt::Response(response) => {
					let status = response.status();
					if status.is_success() {
						return response.json().await.map_err(|e| {
							TransportError::response_parse(
								format!("invalid JSON in {} response", method),
								Some(Box::new(e)),
								Some(HashMap::from([("url".to_string(), url.clone())])),
							)
						});
					}

					let body = response.text().await.unwrap_or_default();
					if !ROTATE_ON_ERROR_CODES.contains(&status.as_u16()) {
						return Err(TransportError::http(status, url, body, None, None));
					}

					if rotations_left == 0 {
						return Err(TransportError::http(status, url, body, None, None));
					}
					rotations_left -= 1;
					tracing::warn!(url = %url, status = %status, "RPC URL is rate limiting, rotating");
					if let Err(rotation) = self.try_rotate_url(transport).await {
						return Err(TransportError::http(
							status,
							url,
							body,
							Some(Box::new(rotation)),
							None,
						));
					}
				}
				Attempt::Network(error) => {
					if rotations_left == 0 {
						return Err(TransportError::network(
							error.to_string(),
							None,
							Some(HashMap::from([("url".to_string(), url)])),
						));
					}
					rotations_left -= 1;
					tracing::warn!(url = %url, error = %error, "RPC URL unreachable, rotating");
					if let Err(rotation) = self.try_rotate_url(transport).await {
						return Err(TransportError::network(
							error.to_string(),
							Some(Box::new(rotation)),
							Some(HashMap::from([("url".to_string(), url)])),
						));
					}
				}
				Attempt::Serialization(error) => return Err(error),
			}
		}
	}
}
