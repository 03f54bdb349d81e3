//! Core domain models.
//!
//! - Networks: chains to watch and how to reach them
//! - Sinks: destinations for canonical blocks

mod network;
mod sink;

pub use network::{BackoffConfig, IngestionMode, NativeCurrency, Network, RpcUrl};
pub use sink::{SinkConfig, SinkType, SinkTypeConfig};
