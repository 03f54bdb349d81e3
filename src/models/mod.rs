//! Domain models and data structures.
//!
//! - `blockchain`: the canonical schema and the raw node payloads it is built from
//! - `config`: configuration loading and validation
//! - `core`: networks and sinks
//! - `security`: secret values

mod blockchain;
mod config;
mod core;
mod security;

pub use blockchain::BlockChainType;

pub use blockchain::canonical::{
	Action, ActionKind, BigValue, BlockExtension, CanonicalBlock, CanonicalTransaction,
	EosTransactionStatus, TokenMovement, TransactionExtension,
};

pub use blockchain::evm::{EVMBlockHeader, EVMTransaction};

pub use blockchain::eos::{
	EOSAction, EOSBlock, EOSChainInfo, EOSCompression, EOSPackedTransaction, EOSPermissionLevel,
	EOSReceiptStatus, EOSReceiptTrx, EOSTransactionReceipt, EOSUnpackedTransaction,
};

pub use core::{
	BackoffConfig, IngestionMode, NativeCurrency, Network, RpcUrl, SinkConfig, SinkType, SinkTypeConfig,
};

pub use config::{ConfigError, ConfigLoader};

pub use security::{SecretString, SecretValue, SecurityError};
