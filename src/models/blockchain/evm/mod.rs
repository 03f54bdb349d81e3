//! Raw EVM JSON-RPC payloads.

mod block;
mod transaction;

pub use block::BlockHeader as EVMBlockHeader;
pub use transaction::Transaction as EVMTransaction;
