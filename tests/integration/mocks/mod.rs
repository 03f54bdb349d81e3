//! Mock implementations for testing purposes.
//!
//! This module contains mock implementations of the traits the watcher is built on:
//! - Node transports (EVM and EOS)
//! - Checkpoint storage
//! - Node responses served by mock HTTP servers
//!
//! The trait mocks are implemented using the `mockall` crate.

mod services;
mod transports;

#[allow(unused_imports)]
pub use models::*;
#[allow(unused_imports)]
pub use services::*;
#[allow(unused_imports)]
pub use transports::*;
