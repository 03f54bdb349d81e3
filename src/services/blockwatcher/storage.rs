//! Checkpoint storage for block watchers.
//!
//! A watcher records the last block it emitted so that a restart resumes from there instead
//! of the current head.

use async_trait::async_trait;
use std::path::PathBuf;

/// Interface for checkpoint storage implementations
#[async_trait]
pub trait BlockStorage: Send + Sync {
	/// Last emitted block of a network, `None` when the network was never watched
	async fn get_last_processed_block(
		&self,
		network_id: &str,
	) -> Result<Option<u64>, anyhow::Error>;

	/// Records the last emitted block of a network
	async fn save_last_processed_block(
		&self,
		network_id: &str,
		block: u64,
	) -> Result<(), anyhow::Error>;
}

/// Checkpoints kept as `{network_id}_last_block.txt` files in one directory
#[derive(Clone, Debug)]
pub struct FileBlockStorage {
	storage_path: PathBuf,
}

impl FileBlockStorage {
	pub fn new(storage_path: PathBuf) -> Self {
		FileBlockStorage { storage_path }
	}

	fn checkpoint_path(&self, network_id: &str) -> PathBuf {
		self.storage_path
			.join(format!("{}_last_block.txt", network_id))
	}
}

impl Default for FileBlockStorage {
	fn default() -> Self {
		FileBlockStorage::new(PathBuf::from("data"))
	}
}

#[async_trait]
impl BlockStorage for FileBlockStorage {
	async fn get_last_processed_block(
		&self,
		network_id: &str,
	) -> Result<Option<u64>, anyhow::Error> {
		let file_path = self.checkpoint_path(network_id);
		if !file_path.exists() {
			return Ok(None);
		}

		let content = tokio::fs::read_to_string(file_path)
			.await
			.map_err(|e| anyhow::anyhow!("Failed to read last processed block: {}", e))?;
		let block_number = content
			.trim()
			.parse::<u64>()
			.map_err(|e| anyhow::anyhow!("Failed to parse last processed block: {}", e))?;
		Ok(Some(block_number))
	}

	/// Writes to a temporary file first so a crash never leaves a truncated checkpoint.
	async fn save_last_processed_block(
		&self,
		network_id: &str,
		block: u64,
	) -> Result<(), anyhow::Error> {
		tokio::fs::create_dir_all(&self.storage_path)
			.await
			.map_err(|e| anyhow::anyhow!("Failed to create storage directory: {}", e))?;

		let file_path = self.checkpoint_path(network_id);
		let tmp_path = file_path.with_extension("txt.tmp");
		tokio::fs::write(&tmp_path, block.to_string())
			.await
			.map_err(|e| anyhow::anyhow!("Failed to save last processed block: {}", e))?;
		tokio::fs::rename(&tmp_path, &file_path)
			.await
			.map_err(|e| anyhow::anyhow!("Failed to save last processed block: {}", e))?;
		Ok(())
	}
}
