//! Blockchain models.
//!
//! `canonical` holds the chain independent schema every watcher emits. `evm` and `eos` hold
//! the raw node payloads they are unified from.

use serde::{Deserialize, Serialize};

pub mod canonical;
pub mod eos;
pub mod evm;

/// Supported chain families
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub enum BlockChainType {
	/// Ethereum Virtual Machine based chains
	EVM,
	/// EOSIO based chains
	EOS,
	/// Bitcoin (schema only, no watcher)
	Bitcoin,
}

impl std::fmt::Display for BlockChainType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::EVM => "EVM",
			Self::EOS => "EOS",
			Self::Bitcoin => "Bitcoin",
		};
		f.write_str(name)
	}
}
