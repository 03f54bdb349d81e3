//! Mock implementations of service traits.
//!
//! - [`MockBlockStorage`] - mockall double of the checkpoint storage
//! - [`MemoryBlockStorage`] - checkpoint storage kept in memory
//! - transport constructors whose clones answer like the original

use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;
use std::{collections::HashMap, sync::Mutex};

use chainwatch::services::{blockchain::TransportError, blockwatcher::BlockStorage};

use super::{MockEOSTransportClient, MockEVMTransportClient};

mock! {
	pub BlockStorage {}

	#[async_trait]
	impl BlockStorage for BlockStorage {
		async fn get_last_processed_block(&self, network_id: &str) -> Result<Option<u64>, anyhow::Error>;
		async fn save_last_processed_block(&self, network_id: &str, block: u64) -> Result<(), anyhow::Error>;
	}
}

/// Checkpoints kept in a map, for asserting what a watcher persisted
#[derive(Default)]
pub struct MemoryBlockStorage {
	pub blocks: Mutex<HashMap<String, u64>>,
}

impl MemoryBlockStorage {
	pub fn with_checkpoint(network_id: &str, block: u64) -> Self {
		Self {
			blocks: Mutex::new(HashMap::from([(network_id.to_string(), block)])),
		}
	}

	pub fn checkpoint(&self, network_id: &str) -> Option<u64> {
		self.blocks.lock().unwrap().get(network_id).copied()
	}
}

#[async_trait]
impl BlockStorage for MemoryBlockStorage {
	async fn get_last_processed_block(
		&self,
		network_id: &str,
	) -> Result<Option<u64>, anyhow::Error> {
		Ok(self.checkpoint(network_id))
	}

	async fn save_last_processed_block(
		&self,
		network_id: &str,
		block: u64,
	) -> Result<(), anyhow::Error> {
		self.blocks
			.lock()
			.unwrap()
			.insert(network_id.to_string(), block);
		Ok(())
	}
}

/// EVM transport answering every call with `respond`, clones included.
///
/// Clients clone their transport for every concurrently fetched transaction.
pub fn evm_transport<F>(respond: F) -> MockEVMTransportClient
where
	F: Fn(&str, Option<Vec<Value>>) -> Result<Value, TransportError>
		+ Send
		+ Sync
		+ Clone
		+ 'static,
{
	let mut transport = MockEVMTransportClient::new();
	let handler = respond.clone();
	transport
		.expect_send_raw_request()
		.returning(move |method, params| handler(method, params));
	transport
		.expect_get_current_url()
		.returning(|| "http://mock.evm".to_string());
	transport
		.expect_clone()
		.returning(move || evm_transport(respond.clone()));
	transport
}

/// EOS transport answering every call with `respond`, clones included.
pub fn eos_transport<F>(respond: F) -> MockEOSTransportClient
where
	F: Fn(&str, Option<Value>) -> Result<Value, TransportError> + Send + Sync + Clone + 'static,
{
	let mut transport = MockEOSTransportClient::new();
	let handler = respond.clone();
	transport
		.expect_send_raw_request()
		.returning(move |method, params| handler(method, params));
	transport
		.expect_get_current_url()
		.returning(|| "http://mock.eos".to_string());
	transport
		.expect_clone()
		.returning(move || eos_transport(respond.clone()));
	transport
}
