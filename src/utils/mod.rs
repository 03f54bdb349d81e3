//! Utility modules for common functionality.
//!
//! - client_storage: Shared, lazily filled client caches
//! - http: Retryable HTTP clients
//! - logging: Logging setup and error context
//! - macros: Deserialization macros
//! - parsing: Parsing helpers
//! - tests: Test builders and helpers

pub mod client_storage;
pub mod http;
pub mod logging;
pub mod macros;
pub mod parsing;

pub use client_storage::ClientStorage;
pub use http::*;
pub use parsing::*;
