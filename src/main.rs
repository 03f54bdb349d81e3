//! Multi-chain block watcher entry point.
//!
//! Watches every configured network for newly irreversible blocks, unifies them into the
//! canonical schema and publishes them to the configured sinks.
//!
//! # Flow
//! 1. Loads networks and sinks from the configuration directory
//! 2. Configures a node client and starts a watcher per network
//! 3. Configures the active sinks
//! 4. Runs each block through the pipeline and fans it out on the worker pool
//! 5. Handles graceful shutdown on Ctrl+C

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

use crate::{
	bootstrap::{
		configure_sinks, fan_in_channel, initialize_services, run_control_loop, shutdown,
		start_watchers, Result, FAN_IN_CAPACITY,
	},
	models::{BlockChainType, Network, SinkConfig, SinkType},
	repositories::{NetworkRepository, SinkRepository},
	services::{
		blockchain::{ClientPool, ClientPoolTrait, ConfigurableClient},
		blockwatcher::FileBlockStorage,
		dispatcher::WorkerPool,
		pipeline::Pipeline,
		sink::{FileSink, PubSubSink, Sink, SinkClientPool, WebhookSink},
	},
	utils::{logging::setup_logging, parse_positive_count, parse_string_to_bytes_size},
};

use clap::Parser;
use dotenvy::dotenv_override;
use std::{
	env::{set_var, var},
	path::PathBuf,
	sync::Arc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Default bound on concurrent fan-out workers
const DEFAULT_MAX_WORKERS: usize = 16;

#[derive(Parser)]
#[command(
	name = "chainwatch",
	about = "Watches blockchain networks for irreversible blocks and publishes them in one canonical schema to webhooks, Pub/Sub topics and files.",
	version
)]
struct Cli {
	/// Directory holding the `networks` and `sinks` configuration folders (default: config/)
	#[arg(long, value_name = "PATH")]
	config_dir: Option<PathBuf>,

	/// Upper bound on concurrent fan-out workers
	#[arg(long, value_name = "COUNT", default_value_t = DEFAULT_MAX_WORKERS, value_parser = parse_positive_count)]
	max_workers: usize,

	/// Write logs to file instead of stdout
	#[arg(long)]
	log_file: bool,

	/// Set log level (trace, debug, info, warn, error)
	#[arg(long, value_name = "LEVEL")]
	log_level: Option<String>,

	/// Path to store log files (default: logs/)
	#[arg(long, value_name = "PATH")]
	log_path: Option<String>,

	/// Maximum log file size before rolling (e.g., "1GB", "500MB", "1024KB")
	#[arg(long, value_name = "SIZE", value_parser = parse_string_to_bytes_size)]
	log_max_size: Option<u64>,

	/// Validate configuration files without starting the service
	#[arg(long)]
	check: bool,
}

impl Cli {
	/// Apply CLI options to environment variables, overriding any existing values
	fn apply_to_env(&self) {
		// Values from .env win over the inherited environment
		dotenv_override().ok();

		if self.log_file {
			set_var("LOG_MODE", "file");
		}

		if let Ok(level) = var("RUST_LOG") {
			set_var("LOG_LEVEL", level);
		}

		if let Some(level) = &self.log_level {
			set_var("LOG_LEVEL", level);
			set_var("RUST_LOG", level);
		}

		if let Some(path) = &self.log_path {
			set_var("LOG_DATA_DIR", path);
		}

		if let Some(max_size) = &self.log_max_size {
			set_var("LOG_MAX_SIZE", max_size.to_string());
		}
	}
}

/// Main entry point for the block watcher.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded.
#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	cli.apply_to_env();

	setup_logging().unwrap_or_else(|e| {
		error!("Failed to setup logging: {}", e);
	});

	if cli.check {
		validate_configuration(&cli).await;
		return Ok(());
	}

	let (networks, sink_configs) =
		initialize_services::<NetworkRepository, SinkRepository>(cli.config_dir.as_deref())
			.await
			.map_err(|e| anyhow::anyhow!("Failed to initialize services: {}", e))?;

	if networks.is_empty() {
		info!("No networks configured. Exiting...");
		return Ok(());
	}

	let sinks = Arc::new(configure_sinks(&sink_configs, &SinkClientPool::new()).await);
	if sinks.is_empty() {
		warn!("No sink could be configured, blocks will not be delivered anywhere");
	} else {
		info!("Publishing to sink(s): {}", sinks.names().join(", "));
	}

	let client_pool = ClientPool::new();
	let storage = Arc::new(FileBlockStorage::default());
	let cancellation = CancellationToken::new();
	let (fan_in, block_rx, err_rx) = fan_in_channel(FAN_IN_CAPACITY);

	let watchers = start_watchers(&networks, &client_pool, storage, fan_in, &cancellation).await;
	if watchers.is_empty() {
		error!("No network watcher could be started. Exiting...");
		return Ok(());
	}

	let pool = Arc::new(WorkerPool::new(cli.max_workers));
	info!("Dispatching on up to {} worker(s)", pool.max_workers());

	let control_loop = tokio::spawn(run_control_loop(
		block_rx,
		err_rx,
		Arc::new(Pipeline::new()),
		sinks,
		pool.clone(),
	));

	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Failed to listen for shutdown signal: {}", e);
	}
	info!("Shutdown signal received, stopping services...");

	let stats = shutdown(&cancellation, watchers, control_loop, &pool).await;
	info!(
		dispatched = stats.dispatched,
		dropped = stats.dropped,
		errors = stats.errors,
		"Stopped"
	);
	Ok(())
}

/// Loads and validates every configuration file and reports what would be started.
///
/// Nodes and sink targets are not contacted.
async fn validate_configuration(cli: &Cli) {
	info!("Validating configuration files...");

	let (networks, sinks) = match initialize_services::<NetworkRepository, SinkRepository>(
		cli.config_dir.as_deref(),
	)
	.await
	{
		Ok(loaded) => loaded,
		Err(e) => {
			error!("{}", e);
			return;
		}
	};
	info!("✓ Configuration files parsed successfully");

	let watchable: Vec<&Network> = networks.iter().filter(|n| network_is_watchable(n)).collect();
	for network in networks.iter().filter(|n| !network_is_watchable(n)) {
		warn!(
			"Network {} is missing settings its client needs and will be skipped",
			network.slug
		);
	}
	if watchable.is_empty() {
		error!("No watchable networks found");
		return;
	}
	info!("✓ Found {} watchable network(s)", watchable.len());

	let usable: Vec<&SinkConfig> = sinks.iter().filter(|s| sink_is_usable(s)).collect();
	if usable.is_empty() {
		warn!("No active sinks found, blocks would not be delivered anywhere");
	} else {
		info!("✓ Found {} active sink(s)", usable.len());
	}

	info!("Configuration validation completed successfully!");
}

fn network_is_watchable(network: &Network) -> bool {
	match network.network_type {
		BlockChainType::EVM => {
			<<ClientPool as ClientPoolTrait>::EvmClient as ConfigurableClient>::can_configure(
				network,
			)
		}
		BlockChainType::EOS => {
			<<ClientPool as ClientPoolTrait>::EosClient as ConfigurableClient>::can_configure(
				network,
			)
		}
		BlockChainType::Bitcoin => false,
	}
}

fn sink_is_usable(sink: &SinkConfig) -> bool {
	match sink.sink_type {
		SinkType::Webhook => WebhookSink::can_configure(&sink.config),
		SinkType::PubSub => PubSubSink::can_configure(&sink.config),
		SinkType::File => FileSink::can_configure(&sink.config),
	}
}
