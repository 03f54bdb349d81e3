//! EVM-compatible blockchain client implementation.
//!
//! Blocks are fetched as headers carrying transaction hashes only. Each transaction is then
//! fetched by index in its own task with its own backoff; the results come back over a channel
//! whose closure marks the end of the block.

use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
	models::{
		Action, ActionKind, BigValue, BlockChainType, BlockExtension, CanonicalBlock,
		CanonicalTransaction, ConfigError, EVMBlockHeader, EVMTransaction, Network,
		TransactionExtension,
	},
	services::{
		backoff::{retry_with_backoff, sleep_with_cancellation, RetryError},
		blockchain::{
			client::{BlockChainClient, ChainHead, ConfigurableClient, FetchedBlock, HeadSender},
			clients::evm::abi::{decode_token_call, format_address},
			transports::{rpc_result, BlockchainTransport, EVMTransportClient, TransportError},
			BlockChainError,
		},
	},
};

/// Client implementation for Ethereum Virtual Machine (EVM) compatible blockchains
#[derive(Clone)]
pub struct EvmClient<T: Send + Sync + Clone> {
	transport: T,
	network: Network,
}

impl<T: Send + Sync + Clone> EvmClient<T> {
	/// Creates a new EVM client instance with a specific transport client
	pub fn new_with_transport(transport: T, network: &Network) -> Self {
		Self {
			transport,
			network: network.clone(),
		}
	}
}

impl EvmClient<EVMTransportClient> {
	pub async fn new(network: &Network) -> Result<Self, anyhow::Error> {
		let transport = EVMTransportClient::new(network).await?;
		Ok(Self::new_with_transport(transport, network))
	}
}

fn hex_u64(value: &Value, what: &str) -> Result<u64, BlockChainError> {
	let raw = value.as_str().ok_or_else(|| {
		BlockChainError::request_error(format!("{} is not a hex string: {}", what, value), None, None)
	})?;
	u64::from_str_radix(raw.trim_start_matches("0x"), 16).map_err(|e| {
		BlockChainError::request_error(
			format!("invalid {} '{}'", what, raw),
			Some(Box::new(e)),
			None,
		)
	})
}

fn transport_error(method: &str, error: TransportError) -> BlockChainError {
	BlockChainError::connection_error(
		format!("{} failed", method),
		Some(Box::new(error)),
		None,
	)
}

fn u256_to_u64(value: U256) -> u64 {
	value.saturating_to::<u64>()
}

impl<T: Send + Sync + Clone + BlockchainTransport + 'static> EvmClient<T> {
	async fn call(&self, method: &str, params: Option<Vec<Value>>) -> Result<Value, BlockChainError> {
		let response = self
			.transport
			.send_raw_request(method, params)
			.await
			.map_err(|e| transport_error(method, e))?;
		rpc_result(response, method).map_err(|e| {
			BlockChainError::request_error(format!("{} returned an error", method), Some(Box::new(e)), None)
		})
	}

	async fn get_header(&self, number: u64) -> Result<EVMBlockHeader, BlockChainError> {
		let result = self
			.call(
				"eth_getBlockByNumber",
				Some(vec![json!(format!("0x{:x}", number)), json!(false)]),
			)
			.await?;
		if result.is_null() {
			return Err(BlockChainError::block_not_found(
				number.to_string(),
				None,
				Some(HashMap::from([(
					"network".to_string(),
					self.network.slug.clone(),
				)])),
			));
		}
		serde_json::from_value(result).map_err(|e| {
			BlockChainError::decode_error(
				format!("malformed header for block {}", number),
				Some(Box::new(e)),
				None,
			)
		})
	}

	async fn get_transaction_by_index(
		&self,
		number: u64,
		index: usize,
	) -> Result<EVMTransaction, BlockChainError> {
		let result = self
			.call(
				"eth_getTransactionByBlockNumberAndIndex",
				Some(vec![
					json!(format!("0x{:x}", number)),
					json!(format!("0x{:x}", index)),
				]),
			)
			.await?;
		if result.is_null() {
			return Err(BlockChainError::request_error(
				format!("transaction {} of block {} not found", index, number),
				None,
				None,
			));
		}
		serde_json::from_value(result).map_err(|e| {
			BlockChainError::decode_error(
				format!("malformed transaction {} of block {}", index, number),
				Some(Box::new(e)),
				None,
			)
		})
	}

	/// Fetches every transaction of the block concurrently, one retried task per index.
	///
	/// Results are ordered by transaction index; failed indexes are returned separately.
	async fn fetch_transactions(
		&self,
		number: u64,
		count: usize,
		cancellation: &CancellationToken,
	) -> (Vec<(usize, EVMTransaction)>, Vec<BlockChainError>) {
		let (tx, mut rx) = mpsc::channel(count.max(1));

		for index in 0..count {
			let client = self.clone();
			let tx = tx.clone();
			let cancellation = cancellation.clone();
			tokio::spawn(async move {
				let result = retry_with_backoff(&client.network.backoff, &cancellation, |_| {
					client.get_transaction_by_index(number, index)
				})
				.await;
				// the receiver only goes away when the block fetch itself was dropped
				let _ = tx.send((index, result)).await;
			});
		}
		drop(tx);

		let mut fetched = Vec::with_capacity(count);
		let mut failed = Vec::new();
		while let Some((index, result)) = rx.recv().await {
			match result {
				Ok(transaction) => fetched.push((index, transaction)),
				Err(RetryError::Cancelled) => {}
				Err(RetryError::Exhausted {
					attempts,
					last_error,
				}) => failed.push(BlockChainError::request_error(
					format!(
						"giving up on transaction {} of block {} after {} attempts",
						index, number, attempts
					),
					Some(Box::new(last_error)),
					Some(HashMap::from([
						("block".to_string(), number.to_string()),
						("index".to_string(), index.to_string()),
					])),
				)),
			}
		}
		fetched.sort_by_key(|(index, _)| *index);
		(fetched, failed)
	}

	fn unify_header(&self, header: &EVMBlockHeader, number: u64) -> CanonicalBlock {
		let hash = header
			.hash
			.map(|h| format!("0x{:x}", h))
			.unwrap_or_default();
		CanonicalBlock {
			network: BlockChainType::EVM,
			network_slug: self.network.slug.clone(),
			header_hash: hash.clone(),
			hash,
			parent_hash: format!("0x{:x}", header.parent_hash),
			number,
			timestamp: u256_to_u64(header.timestamp),
			size: header.size.map(u256_to_u64).unwrap_or_default(),
			extension: BlockExtension::Ethereum {
				miner: format_address(&header.miner),
				nonce: header
					.nonce
					.map(|n| format!("0x{:x}", n))
					.unwrap_or_default(),
				difficulty: BigValue(header.difficulty),
				total_difficulty: header.total_difficulty.map(BigValue),
				gas_limit: BigValue(header.gas_limit),
				gas_used: BigValue(header.gas_used),
				base_fee_per_gas: header.base_fee_per_gas.map(BigValue),
				extra_data: format!("0x{}", hex::encode(&header.extra_data)),
				sha3_uncles: format!("0x{:x}", header.uncles_hash),
				state_root: format!("0x{:x}", header.state_root),
				transactions_root: format!("0x{:x}", header.transactions_root),
				uncles: header.uncles.iter().map(|u| format!("0x{:x}", u)).collect(),
			},
			transactions: Vec::new(),
		}
	}

	/// Converts a node transaction, decoding token calls into actions.
	pub fn unify_transaction(
		&self,
		block: &CanonicalBlock,
		index: usize,
		transaction: &EVMTransaction,
	) -> Result<CanonicalTransaction, BlockChainError> {
		let hash = format!("0x{:x}", transaction.hash);
		let from = transaction
			.from
			.as_ref()
			.map(format_address)
			.unwrap_or_default();
		let to = transaction
			.to
			.as_ref()
			.map(format_address)
			.unwrap_or_default();
		let currency = self.network.currency();

		let mut actions = Vec::new();
		if !transaction.input.is_empty() {
			let call = decode_token_call(&transaction.input, &from, &to).map_err(|reason| {
				BlockChainError::decode_error(
					format!("malformed token call in {}: {}", hash, reason),
					None,
					Some(HashMap::from([
						("block".to_string(), block.number.to_string()),
						("transaction".to_string(), hash.clone()),
					])),
				)
			})?;
			let (name, kind) = match call {
				Some(call) => (call.method.to_string(), call.kind),
				None => (
					transaction
						.selector()
						.map(|s| format!("0x{}", hex::encode(s)))
						.unwrap_or_default(),
					ActionKind::Unknown,
				),
			};
			actions.push(Action {
				index: 0,
				account: to.clone(),
				name,
				authorization: vec![from.clone()],
				data: format!("0x{}", hex::encode(&transaction.input)),
				kind,
			});
		}

		let mut owner = CanonicalTransaction {
			block_hash: block.hash.clone(),
			block_number: block.number,
			hash,
			nonce: u256_to_u64(transaction.nonce),
			transaction_index: transaction.index().unwrap_or(index as u64) as u32,
			from,
			to,
			value: BigValue(transaction.value),
			symbol: currency.symbol,
			precision: currency.precision,
			actions,
			is_derived: false,
			derived_index: None,
			source_action: None,
			extension: TransactionExtension::Ethereum {
				gas: BigValue(transaction.gas),
				gas_price: BigValue(transaction.effective_gas_price()),
				input: format!("0x{}", hex::encode(&transaction.input)),
			},
		};
		owner.flatten_single_movement();
		Ok(owner)
	}

	async fn new_block_filter(&self) -> Result<String, BlockChainError> {
		let id = self.call("eth_newBlockFilter", None).await?;
		id.as_str().map(str::to_string).ok_or_else(|| {
			BlockChainError::request_error(format!("invalid filter id: {}", id), None, None)
		})
	}
}

#[async_trait]
impl<T: Send + Sync + Clone + BlockchainTransport + 'static> BlockChainClient for EvmClient<T> {
	#[instrument(skip(self), fields(network = %self.network.slug))]
	async fn get_chain_head(&self) -> Result<ChainHead, BlockChainError> {
		let latest = hex_u64(&self.call("eth_blockNumber", None).await?, "block number")?;
		Ok(ChainHead {
			latest,
			irreversible: latest.saturating_sub(self.network.confirmation_blocks),
		})
	}

	#[instrument(skip(self, cancellation), fields(network = %self.network.slug))]
	async fn get_block(
		&self,
		number: u64,
		cancellation: &CancellationToken,
	) -> Result<FetchedBlock, BlockChainError> {
		let header = self.get_header(number).await?;
		let mut block = self.unify_header(&header, header.number().unwrap_or(number));

		let (transactions, mut skipped) = self
			.fetch_transactions(number, header.transaction_count(), cancellation)
			.await;

		if cancellation.is_cancelled() {
			return Err(BlockChainError::internal_error(
				format!("fetch of block {} cancelled", number),
				None,
				None,
			));
		}

		for (index, transaction) in transactions {
			match self.unify_transaction(&block, index, &transaction) {
				Ok(canonical) => block.push_transaction(canonical),
				Err(e) => skipped.push(e),
			}
		}

		Ok(FetchedBlock { block, skipped })
	}

	/// Polls a node block filter, recreating it whenever the node forgets it.
	async fn subscribe_heads(
		&self,
		heads: HeadSender,
		cancellation: CancellationToken,
	) -> Result<(), BlockChainError> {
		let interval = std::time::Duration::from_millis(self.network.block_time_ms);
		let mut filter_id: Option<String> = None;

		while !cancellation.is_cancelled() && !heads.is_closed() {
			let id = match &filter_id {
				Some(id) => id.clone(),
				None => match self.new_block_filter().await {
					Ok(id) => {
						filter_id = Some(id.clone());
						id
					}
					Err(e) => {
						if heads.send(Err(e)).await.is_err() {
							break;
						}
						if !sleep_with_cancellation(interval, &cancellation).await {
							break;
						}
						continue;
					}
				},
			};

			match self.call("eth_getFilterChanges", Some(vec![json!(id)])).await {
				Ok(changes) => {
					let has_new = changes.as_array().is_some_and(|c| !c.is_empty());
					if has_new {
						let head = self.get_chain_head().await;
						if heads.send(head).await.is_err() {
							break;
						}
					}
				}
				Err(e) => {
					tracing::warn!(network = %self.network.slug, filter = %id, "block filter lost, recreating");
					filter_id = None;
					if heads.send(Err(e)).await.is_err() {
						break;
					}
				}
			}

			if !sleep_with_cancellation(interval, &cancellation).await {
				break;
			}
		}

		if let Some(id) = filter_id {
			let _ = self.call("eth_uninstallFilter", Some(vec![json!(id)])).await;
		}
		Ok(())
	}
}

#[async_trait]
impl ConfigurableClient for EvmClient<EVMTransportClient> {
	fn can_configure(network: &Network) -> bool {
		network.network_type == BlockChainType::EVM
			&& network.chain_id.is_some()
			&& network
				.rpc_urls
				.iter()
				.any(|u| u.type_ == "rpc" && u.weight > 0 && !u.url.is_empty())
	}

	async fn configure(network: &Network) -> Result<Self, ConfigError> {
		let client = Self::new(network).await.map_err(ConfigError::Other)?;
		let reported = hex_u64(&client.call("eth_chainId", None).await.map_err(|e| {
			ConfigError::validation_error(
				format!("failed to read chain id of {}", network.slug),
				Some(Box::new(e)),
				None,
			)
		})?, "chain id")
		.map_err(|e| {
			ConfigError::validation_error("invalid chain id", Some(Box::new(e)), None)
		})?;

		if Some(reported) != network.chain_id {
			return Err(ConfigError::validation_error(
				format!(
					"network {} expects chain id {:?} but the node reports {}",
					network.slug, network.chain_id, reported
				),
				None,
				None,
			));
		}
		Ok(client)
	}
}
