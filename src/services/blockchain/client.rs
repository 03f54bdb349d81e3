//! Capability interface the block watcher is generic over.
//!
//! A client knows how to read the chain head, fetch one block and unify it into a
//! [`CanonicalBlock`], and optionally how to stream new heads. Everything else about ingestion
//! (ranges, ordering, checkpoints, retries at block granularity) lives in the watcher.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
	models::{CanonicalBlock, ConfigError, Network},
	services::blockchain::BlockChainError,
};

/// Head of the chain as seen by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHead {
	/// Highest block the node knows about
	pub latest: u64,
	/// Highest block considered final
	pub irreversible: u64,
}

/// A unified block plus the transactions that had to be left out of it.
#[derive(Debug)]
pub struct FetchedBlock {
	pub block: CanonicalBlock,
	/// One entry per skipped transaction
	pub skipped: Vec<BlockChainError>,
}

impl FetchedBlock {
	pub fn complete(block: CanonicalBlock) -> Self {
		Self {
			block,
			skipped: Vec::new(),
		}
	}
}

/// Sender side of a head subscription.
pub type HeadSender = mpsc::Sender<Result<ChainHead, BlockChainError>>;

/// Defines the core interface for blockchain clients
#[async_trait]
pub trait BlockChainClient: Send + Sync + Clone + 'static {
	/// Reads the latest and the irreversible block numbers
	async fn get_chain_head(&self) -> Result<ChainHead, BlockChainError>;

	/// Fetches block `number` and unifies it into the canonical schema
	///
	/// A transaction that cannot be fetched or decoded is reported in
	/// [`FetchedBlock::skipped`]; the rest of the block is still returned.
	async fn get_block(
		&self,
		number: u64,
		cancellation: &CancellationToken,
	) -> Result<FetchedBlock, BlockChainError>;

	/// Forwards head notifications into `heads` until cancelled
	///
	/// Returns once `cancellation` fires or `heads` is closed. Clients without push support keep
	/// the default, which refuses to subscribe.
	async fn subscribe_heads(
		&self,
		_heads: HeadSender,
		_cancellation: CancellationToken,
	) -> Result<(), BlockChainError> {
		Err(BlockChainError::request_error(
			"head subscription is not supported by this client",
			None,
			None,
		))
	}
}

/// Clients that can be built from a network configuration.
#[async_trait]
pub trait ConfigurableClient: BlockChainClient + Sized {
	/// Whether `network` carries what this client needs. Never touches the network.
	fn can_configure(network: &Network) -> bool;

	/// Connects to the network's nodes
	async fn configure(network: &Network) -> Result<Self, ConfigError>;
}
