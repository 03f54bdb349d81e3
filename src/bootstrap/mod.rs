//! Bootstrap module wiring watchers, the pipeline and sinks together.
//!
//! The control loop is split into steps that `main` runs in order:
//!
//! - `initialize_services`: loads networks and active sinks from the configuration directory
//! - `start_watchers`: configures one client per network and spawns its watcher into a shared
//!   fan-in channel, skipping networks that cannot be configured
//! - `configure_sinks`: builds and configures the active sinks, keeping the ones that succeed
//! - `run_control_loop`: runs every block through the pipeline and hands the fan-out to the
//!   worker pool, logging watcher errors as they arrive
//! - `shutdown`: cancels the watchers, waits for them and drains the pool

use std::{
	collections::HashMap,
	error::Error,
	path::{Path, PathBuf},
	sync::Arc,
};
use tokio::{
	sync::mpsc,
	task::{JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
	models::{BlockChainType, CanonicalBlock, ConfigError, Network, SinkConfig},
	repositories::{NetworkRepositoryTrait, SinkRepositoryTrait},
	services::{
		blockchain::{BlockChainClient, ClientPoolTrait, ConfigurableClient},
		blockwatcher::{BlockStorage, BlockWatcher, BlockWatcherError},
		dispatcher::WorkerPool,
		pipeline::Pipeline,
		sink::{create_sink, SinkClientPool, SinkSet},
	},
	utils::logging::error::TraceableError,
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Capacity of the fan-in channels shared by all watchers
pub const FAN_IN_CAPACITY: usize = 1024;

/// Loads networks and active sinks.
///
/// Networks are read from `<config_dir>/networks` and sinks from `<config_dir>/sinks`; without a
/// directory the repositories fall back to `config/`.
///
/// # Returns
/// Networks ordered by slug and active sinks ordered by name
///
/// # Errors
/// Returns an error if either repository fails to load
pub async fn initialize_services<N, S>(
	config_dir: Option<&Path>,
) -> Result<(Vec<Network>, Vec<SinkConfig>)>
where
	N: NetworkRepositoryTrait + 'static,
	S: SinkRepositoryTrait + 'static,
{
	let network_dir: Option<PathBuf> = config_dir.map(|dir| dir.join("networks"));
	let sink_dir: Option<PathBuf> = config_dir.map(|dir| dir.join("sinks"));

	let network_repository = N::new(network_dir.as_deref()).await?;
	let sink_repository = S::new(sink_dir.as_deref()).await?;

	let mut networks: Vec<Network> = network_repository.get_all().into_values().collect();
	networks.sort_by(|a, b| a.slug.cmp(&b.slug));

	Ok((networks, sink_repository.get_active()))
}

/// Sending halves of the fan-in channels
#[derive(Clone)]
pub struct FanIn {
	pub blocks: mpsc::Sender<CanonicalBlock>,
	pub errors: mpsc::Sender<BlockWatcherError>,
}

/// Creates the fan-in channels every watcher sends into.
pub fn fan_in_channel(
	capacity: usize,
) -> (
	FanIn,
	mpsc::Receiver<CanonicalBlock>,
	mpsc::Receiver<BlockWatcherError>,
) {
	let (blocks, block_rx) = mpsc::channel(capacity);
	let (errors, err_rx) = mpsc::channel(capacity);
	(FanIn { blocks, errors }, block_rx, err_rx)
}

/// Configures a client per network and spawns its watcher.
///
/// A network whose configuration lacks what its client needs, or whose nodes cannot be
/// reached, is logged and skipped. `fan_in` is consumed so that the channels close once every
/// spawned watcher has returned.
///
/// # Returns
/// The spawned watcher tasks
pub async fn start_watchers<P, S>(
	networks: &[Network],
	client_pool: &P,
	storage: Arc<S>,
	fan_in: FanIn,
	cancellation: &CancellationToken,
) -> JoinSet<()>
where
	P: ClientPoolTrait,
	S: BlockStorage + 'static,
{
	let mut watchers = JoinSet::new();

	for network in networks {
		match network.network_type {
			BlockChainType::EVM => {
				if !check_configurable::<P::EvmClient>(network) {
					continue;
				}
				match client_pool.get_evm_client(network).await {
					Ok(client) => spawn_watcher(
						&mut watchers,
						network,
						(*client).clone(),
						storage.clone(),
						&fan_in,
						cancellation,
					),
					Err(e) => log_skipped(network, &e),
				}
			}
			BlockChainType::EOS => {
				if !check_configurable::<P::EosClient>(network) {
					continue;
				}
				match client_pool.get_eos_client(network).await {
					Ok(client) => spawn_watcher(
						&mut watchers,
						network,
						(*client).clone(),
						storage.clone(),
						&fan_in,
						cancellation,
					),
					Err(e) => log_skipped(network, &e),
				}
			}
			BlockChainType::Bitcoin => {
				let e = ConfigError::validation_error(
					"no watcher is available for this network type",
					None,
					Some(network_metadata(network)),
				);
				log_skipped(network, &e);
			}
		}
	}

	tracing::info!(
		"Started {} of {} network watcher(s)",
		watchers.len(),
		networks.len()
	);
	watchers
}

fn check_configurable<C: ConfigurableClient>(network: &Network) -> bool {
	if C::can_configure(network) {
		return true;
	}
	let e = ConfigError::validation_error(
		"network configuration is incomplete for its client",
		None,
		Some(network_metadata(network)),
	);
	log_skipped(network, &e);
	false
}

fn spawn_watcher<C, S>(
	watchers: &mut JoinSet<()>,
	network: &Network,
	client: C,
	storage: Arc<S>,
	fan_in: &FanIn,
	cancellation: &CancellationToken,
) where
	C: BlockChainClient,
	S: BlockStorage + 'static,
{
	let watcher = BlockWatcher::new(network.clone(), client, storage);
	watchers.spawn(watcher.watch(
		fan_in.blocks.clone(),
		fan_in.errors.clone(),
		cancellation.child_token(),
	));
}

fn network_metadata(network: &Network) -> HashMap<String, String> {
	HashMap::from([
		("network".to_string(), network.slug.clone()),
		("network_type".to_string(), network.network_type.to_string()),
	])
}

fn log_skipped(network: &Network, e: &ConfigError) {
	tracing::error!(
		network = %network.slug,
		trace_id = %e.trace_id(),
		"Skipping network {}: {}",
		network.slug,
		e
	);
}

/// Builds and configures every sink in `configs`.
///
/// Sinks that cannot be built or configured are logged and left out of the returned set.
pub async fn configure_sinks(configs: &[SinkConfig], client_pool: &SinkClientPool) -> SinkSet {
	let mut candidates = Vec::with_capacity(configs.len());
	for config in configs {
		match create_sink(config, client_pool).await {
			Ok(sink) => candidates.push(sink),
			Err(e) => {
				tracing::error!(
					trace_id = %e.trace_id(),
					"Skipping sink {}: {}",
					config.name,
					e
				);
			}
		}
	}
	SinkSet::configure(candidates).await
}

/// What the control loop did before its channels closed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControlLoopStats {
	/// Blocks handed to the worker pool
	pub dispatched: u64,
	/// Blocks rejected by the pipeline or the pool
	pub dropped: u64,
	/// Watcher errors received
	pub errors: u64,
}

/// Routes blocks through `pipeline` into the worker pool until every watcher is gone.
///
/// Each block that passes the pipeline becomes one pool task fanning it out to `sinks`. The
/// loop ends once all senders of `block_rx` are dropped, which happens after the watchers
/// return; blocks still buffered in the channel are dispatched first.
pub async fn run_control_loop(
	mut block_rx: mpsc::Receiver<CanonicalBlock>,
	mut err_rx: mpsc::Receiver<BlockWatcherError>,
	pipeline: Arc<Pipeline>,
	sinks: Arc<SinkSet>,
	pool: Arc<WorkerPool>,
) -> ControlLoopStats {
	let mut stats = ControlLoopStats::default();

	loop {
		tokio::select! {
			block = block_rx.recv() => {
				let Some(block) = block else {
					break;
				};
				if dispatch_block(block, &pipeline, &sinks, &pool) {
					stats.dispatched += 1;
				} else {
					stats.dropped += 1;
				}
			}
			Some(e) = err_rx.recv() => {
				stats.errors += 1;
				tracing::error!(trace_id = %e.trace_id(), "Watcher error: {}", e);
			}
		}
	}

	// Errors sent after the last block
	while let Ok(e) = err_rx.try_recv() {
		stats.errors += 1;
		tracing::error!(trace_id = %e.trace_id(), "Watcher error: {}", e);
	}

	tracing::info!(
		dispatched = stats.dispatched,
		dropped = stats.dropped,
		errors = stats.errors,
		"Control loop finished"
	);
	stats
}

fn dispatch_block(
	block: CanonicalBlock,
	pipeline: &Pipeline,
	sinks: &Arc<SinkSet>,
	pool: &WorkerPool,
) -> bool {
	let block = match pipeline.run(block) {
		Ok(block) => block,
		Err(e) => {
			tracing::error!(trace_id = %e.trace_id(), "Dropping block: {}", e);
			return false;
		}
	};

	let number = block.number;
	let network = block.network_slug.clone();
	let sinks = sinks.clone();
	let submitted = pool.submit(async move {
		if let Err(e) = sinks.fan_out(&block).await {
			tracing::error!(
				trace_id = %e.trace_id(),
				"Failed to fan out block {} of {}: {}",
				block.number,
				block.network_slug,
				e
			);
		}
	});

	match submitted {
		Ok(()) => true,
		Err(e) => {
			tracing::warn!("Dropping block {} of {}: {}", number, network, e);
			false
		}
	}
}

/// Stops the watchers, lets the control loop dispatch what they already sent and drains the
/// worker pool.
///
/// # Returns
/// The control loop's final counts
pub async fn shutdown(
	cancellation: &CancellationToken,
	mut watchers: JoinSet<()>,
	control_loop: JoinHandle<ControlLoopStats>,
	pool: &WorkerPool,
) -> ControlLoopStats {
	cancellation.cancel();

	while let Some(result) = watchers.join_next().await {
		if let Err(e) = result {
			tracing::error!("Watcher task failed: {}", e);
		}
	}

	// The fan-in senders are gone now, so the loop ends after the buffered blocks
	let stats = control_loop.await.unwrap_or_else(|e| {
		tracing::error!("Control loop failed: {}", e);
		ControlLoopStats::default()
	});

	pool.stop_wait().await;
	tracing::info!("Shutdown complete");
	stats
}
