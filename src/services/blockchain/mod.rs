//! Node access for the block watcher.
//!
//! - the [`BlockChainClient`] capability trait the watcher is generic over
//! - EVM and EOS clients that unify node payloads into canonical blocks
//! - HTTP transports with endpoint failover
//! - a pool of configured clients

mod client;
mod clients;
mod error;
mod pool;
mod transports;

pub use client::{BlockChainClient, ChainHead, ConfigurableClient, FetchedBlock, HeadSender};
pub use clients::{
	decode_token_action, decode_token_call, decode_token_payload, name_to_string,
	parse_timestamp, unpack_transaction, Asset, EosClient, EvmClient, Reader, TokenCall,
	TokenPayload,
};
pub use error::BlockChainError;
pub use pool::{ClientPool, ClientPoolTrait};
pub use transports::{
	rpc_result, BlockchainTransport, ConnectionProbe, EOSTransportClient, EVMTransportClient,
	EndpointManager, HttpTransportClient, RotatingTransport, TransientErrorRetryStrategy,
	TransportError,
};
