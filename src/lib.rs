//! Multi-chain block watcher.
//!
//! Watches EVM and EOS networks for newly irreversible blocks, unifies every network's block and
//! transaction encoding into one canonical schema and fans the result out to pluggable sinks on
//! a dynamically sized worker pool.
//!
//! # Module Structure
//!
//! - `bootstrap`: Control loop wiring watchers, pipeline, pool and sinks
//! - `models`: Canonical schema, node payloads and configuration
//! - `repositories`: Network and sink configuration storage
//! - `services`: Watchers, node clients, backoff, worker pool, pipeline and sinks
//! - `utils`: Logging, HTTP retry plumbing and test helpers

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
