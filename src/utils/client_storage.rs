//! Lazily filled cache of shared clients.

use std::{collections::HashMap, future::Future, sync::Arc};
use tokio::sync::RwLock;

/// Shared clients keyed by what they talk to
///
/// Node clients are keyed by network slug, sink HTTP clients by retry policy.
#[derive(Default)]
pub struct ClientStorage<T> {
	pub clients: Arc<RwLock<HashMap<String, Arc<T>>>>,
}

impl<T> ClientStorage<T> {
	pub fn new() -> Self {
		Self {
			clients: Arc::new(RwLock::new(HashMap::new())),
		}
	}

	/// Returns the client stored under `key`, creating it with `create` when missing.
	///
	/// The write lock is held while `create` runs, so concurrent callers never create the same
	/// client twice. A failed creation stores nothing.
	pub async fn get_or_try_insert<F, Fut, E>(&self, key: &str, create: F) -> Result<Arc<T>, E>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		if let Some(client) = self.clients.read().await.get(key) {
			return Ok(client.clone());
		}

		let mut clients = self.clients.write().await;
		if let Some(client) = clients.get(key) {
			return Ok(client.clone());
		}
		let client = Arc::new(create().await?);
		clients.insert(key.to_string(), client.clone());
		Ok(client)
	}

	pub async fn len(&self) -> usize {
		self.clients.read().await.len()
	}
}
