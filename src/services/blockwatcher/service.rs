//! Block watcher service implementation.
//!
//! A [`BlockWatcher`] follows one network through a [`BlockChainClient`] and emits its
//! irreversible blocks, unified into the canonical schema, in strictly increasing order. The
//! same range fetch path serves both ingestion modes: polling the head every block interval, or
//! following head notifications from the node.

use futures::{stream, StreamExt};
use std::{collections::HashMap, ops::RangeInclusive, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
	models::{CanonicalBlock, IngestionMode, Network},
	services::{
		backoff::{retry_with_backoff, sleep_with_cancellation, RetryError},
		blockchain::{BlockChainClient, BlockChainError, ChainHead},
		blockwatcher::{error::BlockWatcherError, storage::BlockStorage},
	},
};

/// Capacity of the channel between the head subscription task and the watcher loop
const HEAD_CHANNEL_CAPACITY: usize = 16;

/// Why a range fetch returned before reaching its target
enum Interrupted {
	Cancelled,
	/// The block receiver is gone, nothing will ever read another block
	Closed,
}

/// Watches a single network and emits its canonical blocks.
pub struct BlockWatcher<C, S> {
	network: Network,
	client: C,
	storage: Arc<S>,
	last_irreversible: Option<u64>,
}

impl<C, S> BlockWatcher<C, S>
where
	C: BlockChainClient,
	S: BlockStorage + 'static,
{
	pub fn new(network: Network, client: C, storage: Arc<S>) -> Self {
		Self {
			network,
			client,
			storage,
			last_irreversible: None,
		}
	}

	/// Last block this watcher emitted or resumed from
	pub fn last_irreversible(&self) -> Option<u64> {
		self.last_irreversible
	}

	/// Runs the configured ingestion strategy until `cancellation` fires.
	///
	/// Blocks go to `block_out` in strictly increasing order. Every error is reported on
	/// `err_out` and the watcher keeps going; it only returns early when `block_out` is closed.
	#[instrument(skip_all, fields(network = %self.network.slug))]
	pub async fn watch(
		mut self,
		block_out: mpsc::Sender<CanonicalBlock>,
		err_out: mpsc::Sender<BlockWatcherError>,
		cancellation: CancellationToken,
	) {
		tracing::info!(
			"Starting {:?} watcher for network {}",
			self.network.ingestion,
			self.network.slug
		);

		if !self.resume(&err_out, &cancellation).await {
			return;
		}

		match self.network.ingestion {
			IngestionMode::Poll => self.poll(&block_out, &err_out, &cancellation).await,
			IngestionMode::Subscribe => {
				self.subscribe(&block_out, &err_out, &cancellation).await
			}
		}

		tracing::info!("Watcher for network {} stopped", self.network.slug);
	}

	/// Loads the checkpoint, or the current irreversible block when there is none.
	///
	/// Returns false when cancelled before a starting point was found.
	async fn resume(
		&mut self,
		err_out: &mpsc::Sender<BlockWatcherError>,
		cancellation: &CancellationToken,
	) -> bool {
		match self
			.storage
			.get_last_processed_block(&self.network.slug)
			.await
		{
			Ok(Some(block)) => {
				tracing::info!("Resuming network {} after block {}", self.network.slug, block);
				self.last_irreversible = Some(block);
				return true;
			}
			Ok(None) => {}
			Err(e) => {
				report(
					err_out,
					BlockWatcherError::storage_error(
						"Failed to load checkpoint, starting from the head",
						Some(e.into()),
						Some(self.metadata()),
					),
				)
				.await;
			}
		}

		loop {
			match self.fetch_head(cancellation).await {
				Ok(head) => {
					self.last_irreversible = Some(head.irreversible);
					return true;
				}
				Err(RetryError::Cancelled) => return false,
				Err(RetryError::Exhausted {
					attempts,
					last_error,
				}) => {
					report(
						err_out,
						self.fetch_failure("chain head", attempts, last_error),
					)
					.await;
					if !self.pause(cancellation).await {
						return false;
					}
				}
			}
		}
	}

	async fn poll(
		&mut self,
		block_out: &mpsc::Sender<CanonicalBlock>,
		err_out: &mpsc::Sender<BlockWatcherError>,
		cancellation: &CancellationToken,
	) {
		loop {
			match self.fetch_head(cancellation).await {
				Ok(head) => {
					if !self
						.advance(head.irreversible, block_out, err_out, cancellation)
						.await
					{
						return;
					}
				}
				Err(RetryError::Cancelled) => return,
				Err(RetryError::Exhausted {
					attempts,
					last_error,
				}) => {
					report(
						err_out,
						self.fetch_failure("chain head", attempts, last_error),
					)
					.await;
				}
			}

			if !self.pause(cancellation).await {
				return;
			}
		}
	}

	/// Follows head notifications, restarting the subscription whenever it ends.
	async fn subscribe(
		&mut self,
		block_out: &mpsc::Sender<CanonicalBlock>,
		err_out: &mpsc::Sender<BlockWatcherError>,
		cancellation: &CancellationToken,
	) {
		// Catch up to the current head before following notifications
		match self.fetch_head(cancellation).await {
			Ok(head) => {
				if !self
					.advance(head.irreversible, block_out, err_out, cancellation)
					.await
				{
					return;
				}
			}
			Err(RetryError::Cancelled) => return,
			// The first notification catches up instead
			Err(RetryError::Exhausted {
				attempts,
				last_error,
			}) => {
				report(
					err_out,
					self.fetch_failure("chain head", attempts, last_error),
				)
				.await;
			}
		}

		loop {
			let (head_tx, mut head_rx) = mpsc::channel(HEAD_CHANNEL_CAPACITY);
			let subscription_token = cancellation.child_token();
			let client = self.client.clone();
			let forwarder = {
				let token = subscription_token.clone();
				tokio::spawn(async move { client.subscribe_heads(head_tx, token).await })
			};

			loop {
				tokio::select! {
					biased;
					_ = cancellation.cancelled() => break,
					head = head_rx.recv() => match head {
						Some(Ok(head)) => {
							if !self
								.advance(head.irreversible, block_out, err_out, cancellation)
								.await
							{
								subscription_token.cancel();
								let _ = forwarder.await;
								return;
							}
						}
						Some(Err(e)) => {
							report(
								err_out,
								BlockWatcherError::subscription_error(
									"Head subscription reported an error",
									Some(Box::new(e)),
									Some(self.metadata()),
								),
							)
							.await;
						}
						None => break,
					}
				}
			}

			subscription_token.cancel();
			match forwarder.await {
				Ok(Ok(())) => {}
				Ok(Err(e)) => {
					report(
						err_out,
						BlockWatcherError::subscription_error(
							"Head subscription ended",
							Some(Box::new(e)),
							Some(self.metadata()),
						),
					)
					.await;
				}
				Err(e) => {
					report(
						err_out,
						BlockWatcherError::subscription_error(
							"Head subscription task failed",
							Some(Box::new(e)),
							Some(self.metadata()),
						),
					)
					.await;
				}
			}

			if cancellation.is_cancelled() || !self.pause(cancellation).await {
				return;
			}
			tracing::debug!("Restarting head subscription for {}", self.network.slug);
		}
	}

	/// Emits every block in `(last_irreversible, target]` and persists the checkpoint.
	///
	/// Returns false once the block receiver is gone.
	async fn advance(
		&mut self,
		target: u64,
		block_out: &mpsc::Sender<CanonicalBlock>,
		err_out: &mpsc::Sender<BlockWatcherError>,
		cancellation: &CancellationToken,
	) -> bool {
		let Some(range) = self.pending_range(target) else {
			return true;
		};

		let outcome = self
			.fetch_range(range, block_out, err_out, cancellation)
			.await;

		if let Some(last) = self.last_irreversible {
			if let Err(e) = self
				.storage
				.save_last_processed_block(&self.network.slug, last)
				.await
			{
				report(
					err_out,
					BlockWatcherError::storage_error(
						"Failed to save checkpoint",
						Some(e.into()),
						Some(self.metadata()),
					),
				)
				.await;
			}
		}

		!matches!(outcome, Err(Interrupted::Closed))
	}

	/// Numbers to fetch to reach `target`, trimmed to `max_past_blocks`.
	fn pending_range(&mut self, target: u64) -> Option<RangeInclusive<u64>> {
		let last = match self.last_irreversible {
			Some(last) if target <= last => return None,
			Some(last) => last,
			None => target.saturating_sub(1),
		};
		let mut start = last + 1;

		if let Some(max_past_blocks) = self.network.max_past_blocks.filter(|m| *m > 0) {
			let behind = target - last;
			if behind > max_past_blocks {
				let skipped_until = target - max_past_blocks;
				tracing::warn!(
					"Network {} is {} blocks behind, skipping blocks {}..={}",
					self.network.slug,
					behind,
					start,
					skipped_until
				);
				start = skipped_until + 1;
				self.last_irreversible = Some(skipped_until);
			}
		}

		Some(start..=target)
	}

	/// Fetches a range with bounded concurrency and emits it in order.
	async fn fetch_range(
		&mut self,
		range: RangeInclusive<u64>,
		block_out: &mpsc::Sender<CanonicalBlock>,
		err_out: &mpsc::Sender<BlockWatcherError>,
		cancellation: &CancellationToken,
	) -> Result<(), Interrupted> {
		tracing::debug!(
			"Fetching blocks {}..={} for {}",
			range.start(),
			range.end(),
			self.network.slug
		);

		let backoff = self.network.backoff;
		let client = &self.client;
		let mut blocks = stream::iter(range)
			.map(|number| async move {
				let result = retry_with_backoff(&backoff, cancellation, |_| {
					client.get_block(number, cancellation)
				})
				.await;
				(number, result)
			})
			.buffered(self.network.max_concurrent_fetches.max(1));

		while let Some((number, result)) = blocks.next().await {
			match result {
				Ok(fetched) => {
					for skipped in fetched.skipped {
						let mut metadata = self.metadata();
						metadata.insert("block".to_string(), number.to_string());
						report(
							err_out,
							BlockWatcherError::decode_error(
								"Transaction left out of block",
								Some(Box::new(skipped)),
								Some(metadata),
							),
						)
						.await;
					}
					if block_out.send(fetched.block).await.is_err() {
						tracing::info!("Block receiver closed for {}", self.network.slug);
						return Err(Interrupted::Closed);
					}
				}
				Err(RetryError::Cancelled) => return Err(Interrupted::Cancelled),
				Err(RetryError::Exhausted {
					attempts,
					last_error,
				}) => {
					report(
						err_out,
						self.fetch_failure(&format!("block {}", number), attempts, last_error),
					)
					.await;
				}
			}
			self.last_irreversible = Some(number);
		}

		Ok(())
	}

	async fn fetch_head(
		&self,
		cancellation: &CancellationToken,
	) -> Result<ChainHead, RetryError<BlockChainError>> {
		retry_with_backoff(&self.network.backoff, cancellation, |_| {
			self.client.get_chain_head()
		})
		.await
	}

	/// Sleeps one block interval. Returns false when cancelled.
	async fn pause(&self, cancellation: &CancellationToken) -> bool {
		sleep_with_cancellation(
			Duration::from_millis(self.network.block_time_ms),
			cancellation,
		)
		.await
	}

	fn fetch_failure(
		&self,
		what: &str,
		attempts: u32,
		last_error: BlockChainError,
	) -> BlockWatcherError {
		let mut metadata = self.metadata();
		metadata.insert("attempts".to_string(), attempts.to_string());
		BlockWatcherError::fetch_error(
			format!("Failed to fetch {}", what),
			Some(Box::new(last_error)),
			Some(metadata),
		)
	}

	fn metadata(&self) -> HashMap<String, String> {
		HashMap::from([("network".to_string(), self.network.slug.clone())])
	}
}

async fn report(err_out: &mpsc::Sender<BlockWatcherError>, error: BlockWatcherError) {
	if err_out.send(error).await.is_err() {
		tracing::warn!("Error receiver closed, dropping watcher error");
	}
}
