use serde_json::{json, Value};
use std::{
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::integration::mocks::{
	eos_block, eos_mainnet_info, eos_transport, evm_header, evm_transport, rpc_response,
	MemoryBlockStorage, MockBlockStorage,
};
use chainwatch::{
	models::{BackoffConfig, CanonicalBlock, IngestionMode},
	services::{
		blockchain::{EosClient, EvmClient},
		blockwatcher::{BlockWatcher, BlockWatcherError},
	},
	utils::tests::builders::network::NetworkBuilder,
};

fn fast_backoff() -> BackoffConfig {
	BackoffConfig {
		base_delay_ms: 1,
		max_delay_ms: 4,
	}
}

fn hex_param(params: &Option<Vec<Value>>) -> u64 {
	let raw = params.as_ref().unwrap()[0].as_str().unwrap();
	u64::from_str_radix(raw.trim_start_matches("0x"), 16).unwrap()
}

async fn collect_blocks(rx: &mut mpsc::Receiver<CanonicalBlock>, count: usize) -> Vec<CanonicalBlock> {
	let mut blocks = Vec::with_capacity(count);
	tokio::time::timeout(Duration::from_secs(10), async {
		while blocks.len() < count {
			match rx.recv().await {
				Some(block) => blocks.push(block),
				None => break,
			}
		}
	})
	.await
	.expect("watcher did not emit enough blocks");
	blocks
}

#[tokio::test]
async fn test_evm_poll_resumes_from_checkpoint() {
	// head 0x69 with one confirmation leaves 104 irreversible
	let transport = evm_transport(|method, params| match method {
		"eth_blockNumber" => Ok(rpc_response(json!("0x69"))),
		"eth_getBlockByNumber" => Ok(rpc_response(evm_header(hex_param(&params), 0))),
		other => panic!("unexpected method {}", other),
	});
	let network = NetworkBuilder::new()
		.slug("eth_test")
		.confirmation_blocks(1)
		.block_time_ms(10)
		.backoff(fast_backoff())
		.build();
	let client = EvmClient::new_with_transport(transport, &network);
	let storage = Arc::new(MemoryBlockStorage::with_checkpoint("eth_test", 100));

	let watcher = BlockWatcher::new(network, client, storage.clone());
	let (block_tx, mut block_rx) = mpsc::channel(16);
	let (err_tx, mut err_rx) = mpsc::channel(16);
	let token = CancellationToken::new();
	let handle = tokio::spawn(watcher.watch(block_tx, err_tx, token.clone()));

	let blocks = collect_blocks(&mut block_rx, 4).await;
	token.cancel();
	handle.await.unwrap();

	let numbers: Vec<u64> = blocks.iter().map(|b| b.number).collect();
	assert_eq!(numbers, vec![101, 102, 103, 104]);
	assert!(blocks.iter().all(|b| b.network_slug == "eth_test"));
	assert_eq!(storage.checkpoint("eth_test"), Some(104));
	assert!(err_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_eos_poll_starts_at_irreversible_head_without_checkpoint() {
	let irreversible = Arc::new(AtomicU64::new(200));
	let head = irreversible.clone();
	let transport = eos_transport(move |method, params| match method {
		"get_info" => {
			let current = head.load(Ordering::SeqCst);
			// the chain finalizes three blocks after the first look
			head.store(203, Ordering::SeqCst);
			Ok(eos_mainnet_info(current + 20, current))
		}
		"get_block" => {
			let number = params.unwrap()["block_num_or_id"].as_u64().unwrap();
			Ok(eos_block(number))
		}
		other => panic!("unexpected method {}", other),
	});
	let network = NetworkBuilder::eos()
		.slug("eos_test")
		.block_time_ms(10)
		.backoff(fast_backoff())
		.build();
	let client = EosClient::new_with_transport(transport, &network);
	let storage = Arc::new(MemoryBlockStorage::default());

	let watcher = BlockWatcher::new(network, client, storage.clone());
	let (block_tx, mut block_rx) = mpsc::channel(16);
	let (err_tx, _err_rx) = mpsc::channel(16);
	let token = CancellationToken::new();
	let handle = tokio::spawn(watcher.watch(block_tx, err_tx, token.clone()));

	let blocks = collect_blocks(&mut block_rx, 3).await;
	token.cancel();
	handle.await.unwrap();

	let numbers: Vec<u64> = blocks.iter().map(|b| b.number).collect();
	assert_eq!(numbers, vec![201, 202, 203]);
	for block in &blocks {
		assert_eq!(block.transactions.len(), 2);
		assert_eq!(block.transactions[0].hash, format!("{:064x}", block.number));
	}
	assert_eq!(storage.checkpoint("eos_test"), Some(203));
}

#[tokio::test]
async fn test_checkpoint_failures_are_reported_and_watching_continues() {
	let transport = evm_transport(|method, params| match method {
		"eth_blockNumber" => Ok(rpc_response(json!("0x0b"))),
		"eth_getBlockByNumber" => Ok(rpc_response(evm_header(hex_param(&params), 0))),
		other => panic!("unexpected method {}", other),
	});
	let network = NetworkBuilder::new()
		.slug("eth_test")
		.confirmation_blocks(1)
		.block_time_ms(10)
		.backoff(fast_backoff())
		.build();
	let client = EvmClient::new_with_transport(transport, &network);

	let mut storage = MockBlockStorage::new();
	storage
		.expect_get_last_processed_block()
		.returning(|_| Ok(Some(7)));
	storage
		.expect_save_last_processed_block()
		.returning(|_, _| Err(anyhow::anyhow!("disk full")));

	let watcher = BlockWatcher::new(network, client, Arc::new(storage));
	let (block_tx, mut block_rx) = mpsc::channel(16);
	let (err_tx, mut err_rx) = mpsc::channel(16);
	let token = CancellationToken::new();
	let handle = tokio::spawn(watcher.watch(block_tx, err_tx, token.clone()));

	let blocks = collect_blocks(&mut block_rx, 3).await;
	let error = tokio::time::timeout(Duration::from_secs(5), err_rx.recv())
		.await
		.unwrap()
		.unwrap();
	token.cancel();
	handle.await.unwrap();

	let numbers: Vec<u64> = blocks.iter().map(|b| b.number).collect();
	assert_eq!(numbers, vec![8, 9, 10]);
	assert!(matches!(error, BlockWatcherError::StorageError(_)));
}

#[tokio::test]
async fn test_evm_subscribe_catches_up_then_follows_filter() {
	let latest = Arc::new(AtomicU64::new(0x10));
	let chain = latest.clone();
	let transport = evm_transport(move |method, params| match method {
		"eth_blockNumber" => Ok(rpc_response(json!(format!(
			"0x{:x}",
			chain.load(Ordering::SeqCst)
		)))),
		"eth_newBlockFilter" => Ok(rpc_response(json!("0xfilter"))),
		"eth_getFilterChanges" => {
			chain.fetch_add(1, Ordering::SeqCst);
			Ok(rpc_response(json!([format!("0x{}", "cd".repeat(32))])))
		}
		"eth_uninstallFilter" => Ok(rpc_response(json!(true))),
		"eth_getBlockByNumber" => Ok(rpc_response(evm_header(hex_param(&params), 0))),
		other => panic!("unexpected method {}", other),
	});
	let network = NetworkBuilder::new()
		.slug("eth_test")
		.confirmation_blocks(1)
		.block_time_ms(10)
		.ingestion(IngestionMode::Subscribe)
		.backoff(fast_backoff())
		.build();
	let client = EvmClient::new_with_transport(transport, &network);
	let storage = Arc::new(MemoryBlockStorage::with_checkpoint("eth_test", 10));

	let watcher = BlockWatcher::new(network, client, storage.clone());
	let (block_tx, mut block_rx) = mpsc::channel(16);
	let (err_tx, _err_rx) = mpsc::channel(16);
	let token = CancellationToken::new();
	let handle = tokio::spawn(watcher.watch(block_tx, err_tx, token.clone()));

	let blocks = collect_blocks(&mut block_rx, 8).await;
	token.cancel();
	handle.await.unwrap();

	// 11..=15 from the catch-up, the rest from filter notifications
	let numbers: Vec<u64> = blocks.iter().map(|b| b.number).collect();
	let expected: Vec<u64> = (11..19).collect();
	assert_eq!(numbers, expected);
	assert!(storage.checkpoint("eth_test").unwrap() >= 18);
}

#[tokio::test]
async fn test_watcher_returns_once_blocks_are_no_longer_read() {
	let transport = evm_transport(|method, params| match method {
		"eth_blockNumber" => Ok(rpc_response(json!("0x100"))),
		"eth_getBlockByNumber" => Ok(rpc_response(evm_header(hex_param(&params), 0))),
		other => panic!("unexpected method {}", other),
	});
	let network = NetworkBuilder::new()
		.slug("eth_test")
		.block_time_ms(10)
		.backoff(fast_backoff())
		.build();
	let client = EvmClient::new_with_transport(transport, &network);
	let storage = Arc::new(MemoryBlockStorage::with_checkpoint("eth_test", 1));

	let watcher = BlockWatcher::new(network, client, storage);
	let (block_tx, block_rx) = mpsc::channel(1);
	let (err_tx, _err_rx) = mpsc::channel(16);
	drop(block_rx);

	tokio::time::timeout(
		Duration::from_secs(5),
		watcher.watch(block_tx, err_tx, CancellationToken::new()),
	)
	.await
	.expect("watcher kept running without a block receiver");
}
