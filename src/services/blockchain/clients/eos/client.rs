//! EOS blockchain client implementation.
//!
//! Reads `get_info` for the irreversible head and `get_block` for full blocks. Transactions
//! arrive either decoded by the node or as an uncompressed `packed_trx`, which is unpacked
//! locally. Token actions are decoded from the node's JSON action data when present and from
//! the binary payload otherwise.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
	models::{
		Action, ActionKind, BigValue, BlockChainType, BlockExtension, CanonicalBlock,
		CanonicalTransaction, ConfigError, EOSAction, EOSBlock, EOSChainInfo, EOSCompression,
		EOSReceiptTrx, EOSTransactionReceipt, EOSUnpackedTransaction, Network, TokenMovement,
		TransactionExtension,
	},
	services::blockchain::{
		client::{BlockChainClient, ChainHead, ConfigurableClient, FetchedBlock},
		clients::eos::codec::{decode_token_payload, unpack_transaction, Asset, TokenPayload},
		transports::{BlockchainTransport, EOSTransportClient},
		BlockChainError,
	},
};

/// Client implementation for EOS networks
#[derive(Clone)]
pub struct EosClient<T: Send + Sync + Clone> {
	transport: T,
	network: Network,
}

impl<T: Send + Sync + Clone> EosClient<T> {
	pub fn new_with_transport(transport: T, network: &Network) -> Self {
		Self {
			transport,
			network: network.clone(),
		}
	}
}

impl EosClient<EOSTransportClient> {
	pub async fn new(network: &Network) -> Result<Self, anyhow::Error> {
		let transport = EOSTransportClient::new(network).await?;
		Ok(Self::new_with_transport(transport, network))
	}
}

/// Parses node timestamps such as `2018-08-23T17:39:23.500` into unix seconds.
pub fn parse_timestamp(raw: &str) -> Result<u64, String> {
	let trimmed = raw.trim_end_matches('Z');
	let parsed = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
		.map_err(|e| format!("invalid timestamp '{}': {}", raw, e))?;
	u64::try_from(parsed.and_utc().timestamp())
		.map_err(|_| format!("timestamp '{}' is before the epoch", raw))
}

fn json_str<'a>(data: &'a Value, field: &str) -> Option<&'a str> {
	data.get(field).and_then(Value::as_str)
}

fn movement(from: String, to: String, quantity: &Asset, memo: String) -> Result<TokenMovement, String> {
	Ok(TokenMovement {
		from,
		to,
		value: quantity.value()?,
		symbol: quantity.symbol.clone(),
		precision: quantity.precision,
		memo,
	})
}

/// Decodes a `transfer`, `issue` or `create` action into its token movement.
///
/// JSON data decoded by the node wins over the binary payload. Other actions are `Unknown`.
pub fn decode_token_action(action: &EOSAction) -> Result<ActionKind, String> {
	if !matches!(action.name.as_str(), "transfer" | "issue" | "create") {
		return Ok(ActionKind::Unknown);
	}

	if action.data.is_object() {
		return decode_json_token_action(action);
	}

	let Some(payload) = action.hex_payload() else {
		return Ok(ActionKind::Unknown);
	};
	let raw = hex::decode(payload).map_err(|e| format!("action data is not hex: {}", e))?;
	let kind = match decode_token_payload(&action.name, &raw)? {
		TokenPayload::Transfer {
			from,
			to,
			quantity,
			memo,
		} => ActionKind::Transfer(movement(from, to, &quantity, memo)?),
		TokenPayload::Issue { to, quantity, memo } => {
			ActionKind::Issue(movement(action.account.clone(), to, &quantity, memo)?)
		}
		TokenPayload::Create {
			issuer,
			maximum_supply,
		} => ActionKind::Mint(movement(
			action.account.clone(),
			issuer,
			&maximum_supply,
			String::new(),
		)?),
	};
	Ok(kind)
}

fn decode_json_token_action(action: &EOSAction) -> Result<ActionKind, String> {
	let data = &action.data;
	let memo = || json_str(data, "memo").unwrap_or_default().to_string();

	let kind = match action.name.as_str() {
		"transfer" => {
			let (Some(from), Some(to), Some(quantity)) = (
				json_str(data, "from"),
				json_str(data, "to"),
				json_str(data, "quantity"),
			) else {
				return Ok(ActionKind::Unknown);
			};
			ActionKind::Transfer(movement(
				from.to_string(),
				to.to_string(),
				&Asset::parse(quantity)?,
				memo(),
			)?)
		}
		"issue" => {
			let (Some(to), Some(quantity)) = (json_str(data, "to"), json_str(data, "quantity"))
			else {
				return Ok(ActionKind::Unknown);
			};
			ActionKind::Issue(movement(
				action.account.clone(),
				to.to_string(),
				&Asset::parse(quantity)?,
				memo(),
			)?)
		}
		_ => {
			let (Some(issuer), Some(supply)) =
				(json_str(data, "issuer"), json_str(data, "maximum_supply"))
			else {
				return Ok(ActionKind::Unknown);
			};
			ActionKind::Mint(movement(
				action.account.clone(),
				issuer.to_string(),
				&Asset::parse(supply)?,
				String::new(),
			)?)
		}
	};
	Ok(kind)
}

impl<T: Send + Sync + Clone + BlockchainTransport + 'static> EosClient<T> {
	async fn call(&self, method: &str, body: Value) -> Result<Value, BlockChainError> {
		self.transport
			.send_raw_request(method, Some(body))
			.await
			.map_err(|e| {
				BlockChainError::connection_error(
					format!("{} failed", method),
					Some(Box::new(e)),
					Some(HashMap::from([(
						"network".to_string(),
						self.network.slug.clone(),
					)])),
				)
			})
	}

	pub async fn get_info(&self) -> Result<EOSChainInfo, BlockChainError> {
		let info = self.call("get_info", json!({})).await?;
		serde_json::from_value(info).map_err(|e| {
			BlockChainError::request_error("malformed get_info response", Some(Box::new(e)), None)
		})
	}

	fn chain_id(&self) -> String {
		self.network.eos_chain_id.clone().unwrap_or_default()
	}

	/// Converts a `get_block` payload, skipping transactions that fail to decode.
	pub fn unify_block(
		&self,
		raw: &EOSBlock,
		size: u64,
	) -> Result<FetchedBlock, BlockChainError> {
		let timestamp = parse_timestamp(&raw.timestamp).map_err(|e| {
			BlockChainError::decode_error(
				format!("block {}: {}", raw.block_num, e),
				None,
				None,
			)
		})?;

		let mut block = CanonicalBlock {
			network: BlockChainType::EOS,
			network_slug: self.network.slug.clone(),
			hash: raw.id.clone(),
			header_hash: raw.id.clone(),
			parent_hash: raw.previous.clone(),
			number: raw.block_num,
			timestamp,
			size,
			extension: BlockExtension::Eos {
				producer: raw.producer.clone(),
				confirmed: raw.confirmed,
				schedule_version: raw.schedule_version,
				transaction_mroot: raw.transaction_mroot.clone(),
				action_mroot: raw.action_mroot.clone(),
				producer_signature: raw.producer_signature.clone(),
				ref_block_prefix: raw.ref_block_prefix,
				chain_id: self.chain_id(),
			},
			transactions: Vec::new(),
		};

		let mut skipped = Vec::new();
		for (index, receipt) in raw.transactions.iter().enumerate() {
			match self.unify_transaction(&block, index, receipt) {
				Ok(transaction) => block.push_transaction(transaction),
				Err(e) => skipped.push(e),
			}
		}

		Ok(FetchedBlock { block, skipped })
	}

	fn unify_transaction(
		&self,
		block: &CanonicalBlock,
		index: usize,
		receipt: &EOSTransactionReceipt,
	) -> Result<CanonicalTransaction, BlockChainError> {
		let hash = receipt.trx.id().to_string();
		let decode_error = |reason: String| {
			BlockChainError::decode_error(
				format!("transaction {}: {}", hash, reason),
				None,
				Some(HashMap::from([
					("block".to_string(), block.number.to_string()),
					("transaction".to_string(), hash.clone()),
				])),
			)
		};

		let (body, signatures): (Option<EOSUnpackedTransaction>, Vec<String>) = match &receipt.trx {
			// deferred transactions are referenced by id only
			EOSReceiptTrx::Id(_) => (None, Vec::new()),
			EOSReceiptTrx::Packed(packed) => {
				let body = match (&packed.transaction, packed.compression) {
					(Some(body), _) => body.clone(),
					(None, EOSCompression::None) => {
						unpack_transaction(&packed.packed_trx).map_err(decode_error)?
					}
					(None, EOSCompression::Zlib) => {
						return Err(decode_error(
							"zlib compressed transactions are not supported".to_string(),
						))
					}
					(None, EOSCompression::Unsupported) => {
						return Err(decode_error("unknown compression".to_string()))
					}
				};
				(Some(body), packed.signatures.clone())
			}
		};

		let mut actions = Vec::new();
		if let Some(body) = &body {
			for (action_index, action) in body.actions.iter().enumerate() {
				let kind = decode_token_action(action)
					.map_err(|e| decode_error(format!("action {}: {}", action_index, e)))?;
				actions.push(Action {
					index: action_index as u32,
					account: action.account.clone(),
					name: action.name.clone(),
					authorization: action.authorization.iter().map(|a| a.to_string()).collect(),
					data: action.hex_payload().unwrap_or_default().to_string(),
					kind,
				});
			}
		}

		let currency = self.network.currency();
		let first = body.as_ref().and_then(|b| b.actions.first());
		let mut transaction = CanonicalTransaction {
			block_hash: block.hash.clone(),
			block_number: block.number,
			hash: hash.clone(),
			nonce: 0,
			transaction_index: index as u32,
			from: first
				.and_then(|a| a.authorization.first())
				.map(|p| p.actor.clone())
				.unwrap_or_default(),
			to: first.map(|a| a.account.clone()).unwrap_or_default(),
			value: BigValue::ZERO,
			symbol: currency.symbol,
			precision: currency.precision,
			actions,
			is_derived: false,
			derived_index: None,
			source_action: None,
			extension: TransactionExtension::Eos {
				status: receipt.status.status(),
				cpu_usage_us: receipt.cpu_usage_us,
				net_usage_words: receipt.net_usage_words,
				expiration: body.map(|b| b.expiration).unwrap_or_default(),
				signatures,
			},
		};
		transaction.flatten_single_movement();
		Ok(transaction)
	}
}

#[async_trait]
impl<T: Send + Sync + Clone + BlockchainTransport + 'static> BlockChainClient for EosClient<T> {
	#[instrument(skip(self), fields(network = %self.network.slug))]
	async fn get_chain_head(&self) -> Result<ChainHead, BlockChainError> {
		let info = self.get_info().await?;
		Ok(ChainHead {
			latest: info.head_block_num,
			irreversible: info.last_irreversible_block_num,
		})
	}

	#[instrument(skip(self, _cancellation), fields(network = %self.network.slug))]
	async fn get_block(
		&self,
		number: u64,
		_cancellation: &CancellationToken,
	) -> Result<FetchedBlock, BlockChainError> {
		let raw = self
			.call("get_block", json!({"block_num_or_id": number}))
			.await?;
		let size = serde_json::to_vec(&raw).map(|b| b.len() as u64).unwrap_or_default();
		let block: EOSBlock = serde_json::from_value(raw).map_err(|e| {
			BlockChainError::decode_error(
				format!("malformed block {}", number),
				Some(Box::new(e)),
				None,
			)
		})?;
		if block.block_num != number {
			return Err(BlockChainError::block_not_found(
				format!("{} (node returned {})", number, block.block_num),
				None,
				None,
			));
		}
		self.unify_block(&block, size)
	}
}

#[async_trait]
impl ConfigurableClient for EosClient<EOSTransportClient> {
	fn can_configure(network: &Network) -> bool {
		network.network_type == BlockChainType::EOS
			&& network
				.eos_chain_id
				.as_deref()
				.is_some_and(|id| !id.is_empty())
			&& network
				.rpc_urls
				.iter()
				.any(|u| u.type_ == "rpc" && u.weight > 0 && !u.url.is_empty())
	}

	async fn configure(network: &Network) -> Result<Self, ConfigError> {
		let client = Self::new(network).await.map_err(ConfigError::Other)?;
		let info = client.get_info().await.map_err(|e| {
			ConfigError::validation_error(
				format!("failed to read chain info of {}", network.slug),
				Some(Box::new(e)),
				None,
			)
		})?;
		if Some(info.chain_id.as_str()) != network.eos_chain_id.as_deref() {
			return Err(ConfigError::validation_error(
				format!(
					"network {} expects chain id {:?} but the node reports {}",
					network.slug, network.eos_chain_id, info.chain_id
				),
				None,
				None,
			));
		}
		Ok(client)
	}
}
