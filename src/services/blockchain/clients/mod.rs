//! Node clients, one per chain family.
//!
//! - EVM: JSON-RPC with per-transaction sub-fetches and ERC-20 call decoding
//! - EOS: chain API with local unpacking of binary transactions

mod eos {
	pub mod client;
	pub mod codec;
}
mod evm {
	pub mod abi;
	pub mod client;
}

pub use eos::client::{decode_token_action, parse_timestamp, EosClient};
pub use eos::codec::{
	decode_token_payload, name_to_string, unpack_transaction, Asset, Reader, TokenPayload,
};
pub use evm::abi::{decode_token_call, TokenCall};
pub use evm::client::EvmClient;
