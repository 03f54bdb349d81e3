//! Repository implementations for configuration management.
//!
//! Each repository loads one kind of configuration from a directory of JSON files and serves
//! it to the control loop:
//!
//! - Network: blockchain connection and ingestion settings, keyed by slug
//! - Sink: block destinations, keyed by name

mod error;
mod network;
mod sink;

pub use error::RepositoryError;
pub use network::{NetworkRepository, NetworkRepositoryTrait};
pub use sink::{SinkRepository, SinkRepositoryTrait};
